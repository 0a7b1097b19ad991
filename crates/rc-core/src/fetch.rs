//! # Fetch support
//!
//! Destination paths for downloaded streams and the outcome reported by a
//! [`MediaFetcher`](crate::traits::MediaFetcher).

use std::path::{Path, PathBuf};

use crate::models::Stream;

/// Default directory receiving downloaded streams.
pub const OUTPUT_DIR: &str = "./output";

/// Destination of `stream` under [`OUTPUT_DIR`].
pub fn derive_filename(stream: &Stream) -> PathBuf {
    derive_filename_in(Path::new(OUTPUT_DIR), stream)
}

/// Destination of `stream` under `dir`: the last segment of the stream URL.
///
/// Two streams whose URLs end with the same segment map to the same file,
/// even across videos.
pub fn derive_filename_in(dir: &Path, stream: &Stream) -> PathBuf {
    dir.join(stream.basename().as_ref())
}

/// What happened when the external downloader ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub source_url: String,
    pub destination: PathBuf,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_filename_uses_last_segment() {
        let stream = Stream::new(1, "HD", "http://x/y/z/clip.mp4").unwrap();
        assert_eq!(derive_filename(&stream), Path::new("./output/clip.mp4"));
        assert_eq!(
            derive_filename(&stream),
            PathBuf::from(format!("{OUTPUT_DIR}/clip.mp4"))
        );
    }

    #[test]
    fn test_derive_filename_drops_query() {
        let stream = Stream::new(1, "HD", "http://cdn/v/clip.mp4?token=abc#t=10").unwrap();
        assert_eq!(derive_filename(&stream), Path::new("./output/clip.mp4"));
    }

    #[test]
    fn test_derive_filename_decodes_escapes() {
        let stream = Stream::new(1, "HD", "http://cdn/v/vidéo du jour.mp4").unwrap();
        assert!(stream.url().ends_with("/vid%C3%A9o%20du%20jour.mp4"));
        assert_eq!(derive_filename(&stream), Path::new("./output/vidéo du jour.mp4"));

        let slashed = Stream::new(1, "HD", "http://cdn/v/a%2Fb.mp4").unwrap();
        assert_eq!(derive_filename(&slashed), Path::new("./output/a%2Fb.mp4"));
    }

    #[test]
    fn test_derive_filename_in_custom_dir() {
        let stream = Stream::new(1, "HD", "rtmp://fms/ondemand/clip.flv").unwrap();
        assert_eq!(
            derive_filename_in(Path::new("/srv/videos"), &stream),
            Path::new("/srv/videos/clip.flv")
        );
    }

    #[test]
    fn test_colliding_basenames_share_a_destination() {
        let a = Stream::new(1, "HD", "http://cdn/one/video.mp4").unwrap();
        let b = Stream::new(2, "HD", "http://cdn/two/video.mp4").unwrap();
        assert_ne!(a, b);
        assert_eq!(derive_filename(&a), derive_filename(&b));
    }
}
