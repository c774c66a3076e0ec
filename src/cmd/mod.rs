pub mod fit;
pub mod inspect;
pub mod score;
pub mod select;
