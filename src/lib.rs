//! # qistudio
//!
//! A Rust library and command-line tool for generating styled QR codes from typed input.
//!
//! `qistudio` turns structured input (free text, a URL, an email, a phone number, Wi-Fi
//! credentials or a contact card) into the exact payload a QR reader expects, keeps a
//! set of render options in sync with style changes, and exports the result as PNG,
//! JPEG, SVG or a single page PDF.
//!
//! ## Features
//!
//! - Payload formatting for `mailto:`, `tel:`, `WIFI:` and vCard 3.0.
//! - Four error correction levels: Low, Medium, Quartile, High.
//! - Square, rounded, classy-rounded and dot modules with matching finder patterns.
//! - Custom colors, transparent backgrounds and a centered logo overlay.
//! - Debounced edits and last-write-wins handling of slow logo loads and rebuilds.
//! - Terminal preview, PNG/JPEG/SVG/PDF export with timestamped file names.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qistudio = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Format a Wi-Fi payload and render it:
//!
//! ```rust
//! use qistudio::encoder::{Encoder, StyledEncoder, Symbol};
//! use qistudio::options::RenderOptions;
//! use qistudio::payload::{format, ContentInput};
//!
//! let data = format(&ContentInput::Wifi {
//!     ssid: "Home".into(),
//!     password: "secret".into(),
//!     security: "WPA".into(),
//! });
//! assert_eq!(data, "WIFI:T:WPA;S:Home;P:secret;H:false;");
//!
//! let symbol = StyledEncoder
//!     .create(&RenderOptions { data, ..RenderOptions::default() })
//!     .unwrap();
//! let image = symbol.to_image();
//! assert_eq!(image.dimensions(), (400, 400));
//! ```
//!
//! Keep options in sync while styling:
//!
//! ```rust
//! use qistudio::encoder::StyledEncoder;
//! use qistudio::generator::{Generator, RenderState};
//! use qistudio::options::ShapeKind;
//! use qistudio::payload::ContentType;
//!
//! let mut generator = Generator::new(StyledEncoder);
//! generator.set_payload("https://example.com", ContentType::Url);
//! generator.set_shape(ShapeKind::Dots);
//! generator.set_dimensions(300);
//! assert_eq!(generator.render_state(), &RenderState::Rendered);
//! ```
//!
//! ## Modules
//!
//! - [`payload`]: Typed input to payload strings.
//! - [`options`]: Render options and their lookup tables.
//! - [`encoder`] and [`render`]: The encoder boundary and styled drawing.
//! - [`generator`]: Render-options state.
//! - [`controller`]: Form state, logo uploads and downloads.
//! - [`export`] and [`pdf`]: File export.
//! - [`live`] and [`cli`]: Command-line front-end.

pub mod cli;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod encoder;
pub mod error;
pub mod export;
pub mod generator;
pub mod live;
pub mod logo;
pub mod notify;
pub mod options;
pub mod payload;
pub mod pdf;
pub mod render;
pub mod sequence;
pub mod theme;
