pub mod courses;
pub mod exercises;
pub mod lessons;
pub mod modules;
pub mod options;
pub mod practice;
pub mod progress;
pub mod sessions;
pub mod users;
pub mod vocabulary;

pub use courses::*;
pub use exercises::*;
pub use lessons::*;
pub use modules::*;
pub use options::*;
pub use practice::*;
pub use progress::*;
pub use sessions::*;
pub use users::*;
pub use vocabulary::*;
