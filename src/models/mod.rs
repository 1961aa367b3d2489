pub mod category;
pub mod game;
pub mod user;

pub use category::Category;
pub use game::{Game, GameRecord};
pub use user::{User, UserProfile};
