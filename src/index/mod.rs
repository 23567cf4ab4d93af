pub mod student_index;
