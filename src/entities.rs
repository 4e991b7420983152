use crate::records::{EntityConfig, FieldSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Students,
    Teachers,
    Attendance,
    Fees,
    Exams,
    Books,
    Timetable,
}

impl Entity {
    pub const ALL: [Entity; 7] = [
        Entity::Students,
        Entity::Teachers,
        Entity::Attendance,
        Entity::Fees,
        Entity::Exams,
        Entity::Books,
        Entity::Timetable,
    ];

    pub fn as_str(self) -> &'static str {
        self.config().table
    }

    pub fn parse(s: &str) -> Option<Entity> {
        Entity::ALL.into_iter().find(|e| e.as_str() == s)
    }

    pub fn config(self) -> &'static EntityConfig {
        match self {
            Entity::Students => &STUDENTS,
            Entity::Teachers => &TEACHERS,
            Entity::Attendance => &ATTENDANCE,
            Entity::Fees => &FEES,
            Entity::Exams => &EXAMS,
            Entity::Books => &BOOKS,
            Entity::Timetable => &TIMETABLE,
        }
    }
}

static STUDENTS: EntityConfig = EntityConfig {
    table: "students",
    title: "Student Management",
    fields: &[
        FieldSpec::text("name", "Name *"),
        FieldSpec::text("roll_no", "Roll No *"),
        FieldSpec::text("class", "Class"),
        FieldSpec::text("section", "Section"),
        FieldSpec::integer("age", "Age", 1),
        FieldSpec::text("phone", "Phone"),
    ],
    display_columns: &["id", "name", "roll_no", "class", "section", "age", "phone"],
    search_columns: &["name", "roll_no", "phone"],
};

static TEACHERS: EntityConfig = EntityConfig {
    table: "teachers",
    title: "Teacher Management",
    fields: &[
        FieldSpec::text("name", "Name *"),
        FieldSpec::text("teacher_id", "ID *"),
        FieldSpec::text("subject", "Subject"),
        FieldSpec::text("phone", "Phone"),
        FieldSpec::text("email", "Email"),
    ],
    display_columns: &["id", "name", "teacher_id", "subject", "phone", "email"],
    search_columns: &["name", "teacher_id", "email"],
};

static ATTENDANCE: EntityConfig = EntityConfig {
    table: "attendance",
    title: "Attendance",
    fields: &[
        FieldSpec::integer("student_id", "Student ID *", 1),
        FieldSpec::date("date", "Date"),
        FieldSpec::text("status", "Status"),
    ],
    display_columns: &["id", "student_id", "date", "status"],
    search_columns: &["student_id", "date", "status"],
};

static FEES: EntityConfig = EntityConfig {
    table: "fees",
    title: "Fees Management",
    fields: &[
        FieldSpec::integer("student_id", "Student ID *", 1),
        FieldSpec::real("amount", "Amount", 0.0),
        FieldSpec::date("due_date", "Due Date"),
        FieldSpec::text("status", "Status"),
    ],
    display_columns: &["id", "student_id", "amount", "due_date", "status"],
    search_columns: &["student_id", "status"],
};

static EXAMS: EntityConfig = EntityConfig {
    table: "exams",
    title: "Exams",
    fields: &[
        FieldSpec::text("exam_name", "Exam Name *"),
        FieldSpec::text("subject", "Subject"),
        FieldSpec::text("class", "Class"),
        FieldSpec::date("exam_date", "Exam Date"),
        FieldSpec::integer("max_marks", "Max Marks", 1),
    ],
    display_columns: &["id", "exam_name", "subject", "class", "exam_date", "max_marks"],
    search_columns: &["exam_name", "subject", "class"],
};

static BOOKS: EntityConfig = EntityConfig {
    table: "books",
    title: "Library Books",
    fields: &[
        FieldSpec::text("title", "Title *"),
        FieldSpec::text("author", "Author"),
        FieldSpec::text("isbn", "ISBN *"),
        FieldSpec::integer("copies", "Copies", 1),
    ],
    display_columns: &["id", "title", "author", "isbn", "copies"],
    search_columns: &["title", "author", "isbn"],
};

static TIMETABLE: EntityConfig = EntityConfig {
    table: "timetable",
    title: "Timetable",
    fields: &[
        FieldSpec::text("class", "Class"),
        FieldSpec::text("day", "Day"),
        FieldSpec::integer("period", "Period", 1),
        FieldSpec::text("subject", "Subject"),
        FieldSpec::text("teacher", "Teacher"),
    ],
    display_columns: &["id", "class", "day", "period", "subject", "teacher"],
    search_columns: &["class", "day", "subject", "teacher"],
};
