//! spritesplit - Library for splitting AI-generated sprite sheets
//!
//! This library provides functionality to:
//! - Read item names from a generation prompt
//! - Read text labels off a reference image with an external OCR engine
//! - Cut a transparent composite image into individual sprites
//! - Name each sprite from nearby labels and the prompt
//! - Write sprites onto fixed canvases and keep a cumulative index

pub mod canvas;
pub mod cli;
pub mod config;
pub mod index;
pub mod matcher;
pub mod naming;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod publish;
pub mod segment;
