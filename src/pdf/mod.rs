//! MuPDF-backed document engine

mod engine;

pub use engine::MupdfEngine;
