use super::BlockKind::{Break, Study};
use super::{BlockDraft, BlockKind, ScheduleDraft};

fn block(name: &str, kind: BlockKind, start: &str, duration_min: u32, subject: &str, notes: &str) -> BlockDraft {
    BlockDraft {
        id: None,
        name: name.into(),
        kind,
        start_time: start.into(),
        duration_min,
        subject: subject.into(),
        notes: notes.into(),
    }
}

/// Built-in schedules offered by `seed`.
pub fn sample_schedules() -> Vec<ScheduleDraft> {
    vec![
        ScheduleDraft {
            name: "JEE Preparation".into(),
            description: "Daily schedule for JEE Mains & Advanced preparation".into(),
            color: Some("#4a8f7a".into()),
            blocks: vec![
                block("Mathematics - Calculus", Study, "06:00", 60, "Mathematics", "Focus on integration by parts"),
                block("Morning Break", Break, "07:00", 15, "", ""),
                block("Physics - Mechanics", Study, "07:15", 75, "Physics", "Newton laws + problem sets"),
                block("Short Break", Break, "08:30", 10, "", ""),
                block("Chemistry - Organic", Study, "08:40", 60, "Chemistry", "Reaction mechanisms"),
                block("Lunch & Rest", Break, "09:40", 40, "", "Eat well, short walk"),
                block("Mathematics - Algebra", Study, "10:20", 60, "Mathematics", "Matrices and determinants"),
                block("Short Break", Break, "11:20", 10, "", ""),
                block("Physics - Electricity", Study, "11:30", 60, "Physics", "Coulomb law, capacitors"),
                block("Short Break", Break, "12:30", 10, "", ""),
                block("Chemistry - Inorganic", Study, "12:40", 50, "Chemistry", "Periodic table trends"),
                block("Evening Revision", Study, "13:30", 45, "Revision", "Review all topics of the day"),
                block("Mock Test Practice", Study, "14:15", 60, "Mock Test", "Full syllabus questions"),
                block("Wind Down", Break, "15:15", 15, "", "Light reading, relax"),
            ],
        },
        ScheduleDraft {
            name: "Board Exam Schedule".into(),
            description: "Class 12 Board preparation - Science stream".into(),
            color: Some("#5b8dee".into()),
            blocks: vec![
                block("English Literature", Study, "07:00", 50, "English", "Essay writing practice"),
                block("Short Break", Break, "07:50", 10, "", ""),
                block("Mathematics", Study, "08:00", 90, "Mathematics", "Chapter problems"),
                block("Lunch", Break, "09:30", 30, "", ""),
                block("Physics", Study, "10:00", 60, "Physics", "Derivations & numericals"),
                block("Break", Break, "11:00", 15, "", ""),
                block("Chemistry", Study, "11:15", 60, "Chemistry", "Reactions and equations"),
                block("Biology", Study, "12:15", 45, "Biology", "Diagrams and definitions"),
                block("Revision Hour", Study, "13:00", 60, "Revision", "Daily topics review"),
            ],
        },
        ScheduleDraft {
            name: "Weekend Light Study".into(),
            description: "Relaxed weekend schedule with extra breaks".into(),
            color: Some("#8f7a4a".into()),
            blocks: vec![
                block("Morning Reading", Study, "09:00", 45, "Reading", "Self-study, light topics"),
                block("Break", Break, "09:45", 20, "", ""),
                block("Mathematics Practice", Study, "10:05", 60, "Mathematics", "Solve previous year papers"),
                block("Long Break", Break, "11:05", 45, "", "Walk or exercise"),
                block("Science Concepts", Study, "11:50", 50, "Science", "Concept clarity sessions"),
                block("Revision & Notes", Study, "12:40", 40, "Revision", "Organize notes, make mind maps"),
            ],
        },
    ]
}
