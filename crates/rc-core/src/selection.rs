//! Best-stream selection.

use crate::models::{Stream, Video};

/// Picks the stream to download for `video` out of a loaded collection.
///
/// Streams belonging to other videos are ignored. The first label of
/// [`QUALITY_PRIORITY`](crate::models::QUALITY_PRIORITY) present wins; if
/// several streams share it, the one with the smallest URL is returned.
/// When no stream carries a ranked label the first stream of the collection
/// is returned, in the order given.
pub fn best_stream<'a>(video: &Video, streams: &'a [Stream]) -> Option<&'a Stream> {
    let mut candidates = streams.iter().filter(|s| s.vid() == video.vid()).peekable();
    let first = *candidates.peek()?;

    let ranked = candidates
        .filter_map(|s| s.quality().rank().map(|rank| (rank, s)))
        .min_by(|(rank_a, a), (rank_b, b)| rank_a.cmp(rank_b).then_with(|| a.url().cmp(b.url())));

    Some(ranked.map_or(first, |(_, s)| s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quality;

    fn video() -> Video {
        Video::new(1, 10, "clip").unwrap()
    }

    fn stream(quality: &str, url: &str) -> Stream {
        Stream::new(1, quality, url).unwrap()
    }

    #[test]
    fn test_prefers_hd() {
        let streams = vec![
            stream("BAS_DEBIT", "http://cdn/clip_bas.mp4"),
            stream("HD", "http://cdn/clip_hd.mp4"),
        ];
        let best = best_stream(&video(), &streams).unwrap();
        assert_eq!(best.quality(), &Quality::Hd);
    }

    #[test]
    fn test_walks_priority_list() {
        let streams = vec![
            stream("BAS_DEBIT", "http://cdn/clip_bas.mp4"),
            stream("MOBILE", "http://cdn/clip_mob.mp4"),
            stream("HAUT_DEBIT", "http://cdn/clip_haut.mp4"),
        ];
        let best = best_stream(&video(), &streams).unwrap();
        assert_eq!(best.quality(), &Quality::HautDebit);

        let only_low = vec![stream("BAS_DEBIT", "http://cdn/clip_bas.mp4")];
        let best = best_stream(&video(), &only_low).unwrap();
        assert_eq!(best.quality(), &Quality::BasDebit);
    }

    #[test]
    fn test_no_streams_is_absence() {
        assert!(best_stream(&video(), &[]).is_none());
    }

    #[test]
    fn test_unranked_falls_back_to_first() {
        let streams = vec![
            stream("4K", "http://cdn/clip_4k.mp4"),
            stream("MOBILE", "http://cdn/clip_mob.mp4"),
        ];
        let best = best_stream(&video(), &streams).unwrap();
        assert_eq!(best.url(), "http://cdn/clip_4k.mp4");
    }

    #[test]
    fn test_tie_break_on_smallest_url() {
        let streams = vec![
            stream("HD", "http://cdn/z.mp4"),
            stream("HD", "http://cdn/a.mp4"),
            stream("BAS_DEBIT", "http://cdn/0.mp4"),
        ];
        let best = best_stream(&video(), &streams).unwrap();
        assert_eq!(best.url(), "http://cdn/a.mp4");
    }

    #[test]
    fn test_ignores_streams_of_other_videos() {
        let streams = vec![
            Stream::new(2, "HD", "http://cdn/other_hd.mp4").unwrap(),
            stream("BAS_DEBIT", "http://cdn/clip_bas.mp4"),
        ];
        let best = best_stream(&video(), &streams).unwrap();
        assert_eq!(best.url(), "http://cdn/clip_bas.mp4");

        let foreign = vec![Stream::new(2, "HD", "http://cdn/other_hd.mp4").unwrap()];
        assert!(best_stream(&video(), &foreign).is_none());
    }
}
