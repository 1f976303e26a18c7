use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

use crate::geom::Quad;
use crate::model::TextCandidate;

mod fixture;
mod parse;
mod tesseract;

pub use fixture::FixtureRecognizer;
pub use tesseract::{TesseractOptions, TesseractRecognizer, list_tesseract_languages};

pub type RecognizerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Text localization and transcription backend.
///
/// Both methods receive an encoded image. Returning an empty list is a normal
/// answer; errors are treated by the pipeline as "nothing found".
pub trait TextRecognizer: Send + Sync {
    /// Finds text regions without transcribing them.
    fn detect_regions<'a>(&'a self, image: &'a [u8]) -> RecognizerFuture<'a, Vec<Quad>>;

    /// Transcribes text, favoring accuracy over speed and without dictionary
    /// correction.
    fn extract_text<'a>(&'a self, image: &'a [u8]) -> RecognizerFuture<'a, Vec<TextCandidate>>;
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for Box<R> {
    fn detect_regions<'a>(&'a self, image: &'a [u8]) -> RecognizerFuture<'a, Vec<Quad>> {
        (**self).detect_regions(image)
    }

    fn extract_text<'a>(&'a self, image: &'a [u8]) -> RecognizerFuture<'a, Vec<TextCandidate>> {
        (**self).extract_text(image)
    }
}
