//! Pipeline stages for turning one nest report into a [`crate::model::Nest`].
//!
//! Each submodule implements one step. The steps run strictly in order for
//! each file: part thumbnails are matched to parts by position, so nothing
//! here is reordered or parallelised.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ fields ──▶ images ──▶ builder
//! (path)    (pdfium)    (regex)    (files)    (Nest)
//! ```
//!
//! 1. [`input`]  : validate paths, expand directories, spill bytes to a temp dir
//! 2. [`extract`]: page text and embedded images through the [`extract::NestDocument`] trait
//! 3. [`fields`] : named regex table producing per-part and sheet values
//! 4. [`images`] : classify, number and later rename pictures
//! 5. [`builder`]: zip fields and pictures into parts and build the nest

pub mod builder;
pub mod extract;
pub mod fields;
pub mod images;
pub mod input;
