pub mod attempt;
pub mod course;
pub mod exam;
pub mod question;
pub mod result;
