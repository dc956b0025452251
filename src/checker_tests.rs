//! Tests for the check orchestrator

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::checker::Checker;
    use crate::error::ErrorKind;
    use crate::models::{ChannelEntry, StreamInfo, StreamStatus};
    use crate::prober::{ProbeError, StreamProber};
    use crate::store::ResultStore;

    /// Answers probes from a URL -> result table; unknown URLs time out
    struct FakeProber {
        answers: HashMap<String, Result<StreamInfo, ProbeError>>,
    }

    impl FakeProber {
        fn new() -> Self {
            Self { answers: HashMap::new() }
        }

        fn alive(mut self, url: &str, resolution: &str, fps: f64) -> Self {
            let info = StreamInfo {
                status: StreamStatus::Alive,
                codec: "h264".into(),
                resolution: resolution.into(),
                framerate: format!("{:.2} fps", fps),
                framerate_num: fps,
                bitrate: "128000".into(),
                ..StreamInfo::default()
            };
            self.answers.insert(url.to_string(), Ok(info));
            self
        }

        fn failing(mut self, url: &str, err: ProbeError) -> Self {
            self.answers.insert(url.to_string(), Err(err));
            self
        }
    }

    impl StreamProber for FakeProber {
        fn probe(&self, url: &str, _timeout_secs: u64) -> Result<StreamInfo, ProbeError> {
            self.answers.get(url).cloned().unwrap_or(Err(ProbeError::Timeout))
        }
    }

    fn channel(name: &str, url: &str) -> ChannelEntry {
        ChannelEntry {
            name: name.to_string(),
            group: "Sports".to_string(),
            logo: String::new(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("results.json"));
        let prober = FakeProber::new()
            .alive("http://example.com/a.ts", "1920x1080", 29.0)
            .failing("http://example.com/b.ts", ProbeError::Timeout);
        let checker = Checker::new(prober, store);

        let summary = checker
            .run_check(
                vec![
                    channel("Arena 4K", "http://example.com/a.ts"),
                    channel("Backup Feed", "http://example.com/b.ts"),
                ],
                10,
            )
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.alive, 1);
        assert_eq!(summary.dead, 1);
        assert_eq!(summary.low_framerate, 1);
        assert_eq!(summary.mislabeled, 1);
        assert!(!summary.checked_at.is_empty());

        let doc = checker.store().load().unwrap();
        assert_eq!(doc.summary, summary);
        assert_eq!(doc.channels.len(), 2);

        let a = &doc.channels[0];
        assert_eq!(a.name, "Arena 4K");
        assert_eq!(a.status, StreamStatus::Alive);
        assert!(a.mislabeled);
        assert!(a.low_framerate);
        assert_eq!(a.framerate, "29.00 fps");

        let b = &doc.channels[1];
        assert_eq!(b.status, StreamStatus::Dead);
        assert_eq!(b.error, "Connection timeout");
        assert!(!b.low_framerate);
        assert!(!b.mislabeled);
        assert!(b.resolution.is_empty());
    }

    #[test]
    fn test_all_dead_keeps_totals() {
        let dir = tempfile::tempdir().unwrap();
        let prober = FakeProber::new()
            .failing("http://example.com/1.ts", ProbeError::failed(""))
            .failing("http://example.com/2.ts", ProbeError::NoVideoStream);
        let checker = Checker::new(prober, ResultStore::new(dir.path().join("r.json")));

        let channels = vec![
            channel("One HD", "http://example.com/1.ts"),
            channel("Two", "http://example.com/2.ts"),
            channel("Three", "http://example.com/3.ts"),
        ];
        let summary = checker.run_check(channels, 5).unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.dead, 3);
        assert_eq!(summary.alive + summary.dead, summary.total);
        assert_eq!(summary.mislabeled, 0);

        let errors: Vec<String> = checker
            .store()
            .load()
            .unwrap()
            .channels
            .into_iter()
            .map(|c| c.error)
            .collect();
        assert_eq!(errors, vec!["Stream not accessible", "No video stream found", "Connection timeout"]);
    }

    #[test]
    fn test_flags_counted_independently_of_status() {
        let dir = tempfile::tempdir().unwrap();
        let prober = FakeProber::new()
            .alive("http://example.com/1.ts", "1280x720", 25.0)
            .alive("http://example.com/2.ts", "3840x2160", 50.0)
            .alive("http://example.com/3.ts", "720x576", 0.0);
        let checker = Checker::new(prober, ResultStore::new(dir.path().join("r.json")));

        let summary = checker
            .run_check(
                vec![
                    channel("Movies FHD", "http://example.com/1.ts"),
                    channel("Nature 4K", "http://example.com/2.ts"),
                    channel("Kids HD", "http://example.com/3.ts"),
                ],
                10,
            )
            .unwrap();

        assert_eq!(summary.alive, 3);
        assert_eq!(summary.low_framerate, 1);
        assert_eq!(summary.mislabeled, 2);
    }

    #[test]
    fn test_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let checker = Checker::new(FakeProber::new(), ResultStore::new(dir.path().join("r.json")));
        let summary = checker.run_check(Vec::new(), 10).unwrap();
        assert_eq!(summary.total, 0);
        assert!(checker.store().load().unwrap().channels.is_empty());
    }

    #[test]
    fn test_second_run_overwrites_first() {
        let dir = tempfile::tempdir().unwrap();
        let prober = FakeProber::new()
            .alive("http://example.com/1.ts", "1920x1080", 50.0)
            .alive("http://example.com/2.ts", "1920x1080", 50.0);
        let checker = Checker::new(prober, ResultStore::new(dir.path().join("r.json")));

        checker
            .run_check(
                vec![
                    channel("First", "http://example.com/1.ts"),
                    channel("Second", "http://example.com/2.ts"),
                ],
                10,
            )
            .unwrap();
        checker.run_check(vec![channel("Only", "http://example.com/2.ts")], 10).unwrap();

        let doc = checker.store().load().unwrap();
        assert_eq!(doc.summary.total, 1);
        assert_eq!(doc.channels.len(), 1);
        assert_eq!(doc.channels[0].name, "Only");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unwritable_store_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = ResultStore::new(blocker.join("r.json"));
        let checker = Checker::new(FakeProber::new(), store);

        let err = checker
            .run_check(vec![channel("One", "http://example.com/1.ts")], 10)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
