mod answer;
mod assignment;
mod ids;
mod progress;
mod quiz;
mod user;

pub use ids::{AnswerId, AssignmentId, ParseIdError, ProgressId, QuizId, UserId};

pub use answer::Answer;
pub use assignment::{Assignment, AssignmentError, MAX_TITLE_LEN, Material, MaterialType};
pub use progress::{AttemptStatus, Progress, ProgressError, ProgressStatus};
pub use quiz::{DEFAULT_POINTS, MAX_QUESTION_LEN, OptionLetter, Quiz, QuizError};
pub use user::{Role, User, UserError};
