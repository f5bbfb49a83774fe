pub mod mastery;
pub mod question_gen;

pub use mastery::MasteryStore;
pub use question_gen::QuestionService;
