//! Testing utilities and mock implementations.
//!
//! Mocks of the collaborator traits so the orchestrator and the processing
//! endpoint can be exercised without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use squeeze_core::testing::{fixtures, MockGateway};
//!
//! let gateway = Arc::new(MockGateway::new());
//! gateway.set_delay("a.png", Duration::from_millis(200));
//!
//! let orchestrator = TransferOrchestrator::new(OrchestratorConfig::default(), gateway.clone());
//! orchestrator.start();
//! let mut batch = orchestrator.submit_batch(vec![fixtures::png_file("a.png")])?;
//! batch.wait().await;
//!
//! assert_eq!(gateway.call_order(), vec!["a.png"]);
//! ```

mod mock_cdn;
mod mock_gateway;

pub use mock_cdn::MockCdn;
pub use mock_gateway::MockGateway;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Cursor;

    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};

    use crate::upload::SourceFile;

    /// Encode a gradient RGB image as PNG.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        encode_png(DynamicImage::ImageRgb8(img))
    }

    /// Encode a grayscale image as PNG.
    pub fn gray_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));
        encode_png(DynamicImage::ImageLuma8(img))
    }

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png)
            .expect("in-memory PNG encoding cannot fail");
        buf.into_inner()
    }

    /// A small valid PNG upload.
    pub fn png_file(name: &str) -> SourceFile {
        SourceFile::new(name, "image/png", png_bytes(32, 32))
    }

    /// An upload with arbitrary content.
    pub fn file(name: &str, media_type: &str, bytes: Vec<u8>) -> SourceFile {
        SourceFile::new(name, media_type, bytes)
    }

    /// A `image/jpeg` upload of exactly `size` bytes (content is not a real image).
    pub fn sized_file(name: &str, size: usize) -> SourceFile {
        SourceFile::new(name, "image/jpeg", vec![0xAB; size])
    }
}
