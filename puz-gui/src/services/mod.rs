pub mod puzzle_service;

pub use puzzle_service::PuzzleService;
