#[cfg(test)]
mod service_tests {
    use crate::core::Mode;
    use crate::service::{ModeListener, Service};
    use anyhow::{Result, bail};
    use std::sync::mpsc::{Receiver, channel};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Mode>>,
    }

    impl ModeListener for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_mode_changed(&self, mode: Mode) -> Result<()> {
            self.seen.lock().unwrap().push(mode);
            Ok(())
        }
    }

    struct Failing;

    impl ModeListener for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn on_mode_changed(&self, _mode: Mode) -> Result<()> {
            bail!("no display")
        }
    }

    struct Panicking;

    impl ModeListener for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn on_mode_changed(&self, _mode: Mode) -> Result<()> {
            panic!("boom")
        }
    }

    /// Blocks until the test releases it.
    struct Gate {
        release: Mutex<Receiver<()>>,
    }

    impl ModeListener for Gate {
        fn name(&self) -> &str {
            "gate"
        }

        fn on_mode_changed(&self, _mode: Mode) -> Result<()> {
            let _ = self
                .release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(10));
            Ok(())
        }
    }

    #[test]
    fn test_change_mode_deduplicates() {
        let service = Service::new(Mode::Unknown);
        let recorder = Arc::new(Recorder::default());
        service.add_listener(recorder.clone()).unwrap();

        service.change_mode(Mode::Light).unwrap().wait();
        assert!(service.change_mode(Mode::Light).is_none());
        service.change_mode(Mode::Dark).unwrap().wait();
        assert!(service.change_mode(Mode::Unknown).is_none());

        assert_eq!(*recorder.seen.lock().unwrap(), vec![Mode::Light, Mode::Dark]);
        assert_eq!(service.current_mode(), Mode::Dark);
    }

    #[test]
    fn test_initial_mode_is_not_broadcast() {
        let service = Service::new(Mode::Dark);
        assert!(service.change_mode(Mode::Dark).is_none());
    }

    #[test]
    fn test_late_listener_catches_up() {
        let service = Service::new(Mode::Dark);
        let recorder = Arc::new(Recorder::default());
        let outcome = service.add_listener(recorder.clone()).unwrap().unwrap();

        assert!(outcome.is_success());
        assert_eq!(*recorder.seen.lock().unwrap(), vec![Mode::Dark]);

        // Nothing to catch up on before the first decision
        let fresh = Service::new(Mode::Unknown);
        assert!(
            fresh
                .add_listener(Arc::new(Recorder::default()))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_failures_are_captured_per_listener() {
        let service = Service::new(Mode::Unknown);
        service.add_listener(Arc::new(Recorder::default())).unwrap();
        service.add_listener(Arc::new(Failing)).unwrap();
        service.add_listener(Arc::new(Panicking)).unwrap();

        let outcomes = service.change_mode(Mode::Dark).unwrap().wait();
        assert_eq!(outcomes.len(), 3);

        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.listener.as_str())
            .collect();
        assert!(failed.contains(&"failing"));
        assert!(failed.contains(&"panicking"));

        let failing = outcomes.iter().find(|o| o.listener == "failing").unwrap();
        assert_eq!(failing.result, Err("no display".to_string()));
        assert_eq!(failing.mode, Mode::Dark);

        assert_eq!(service.dispatcher().failures().len(), 2);
        assert_eq!(service.dispatcher().history().len(), 3);
    }

    /// Slow only the first time it sees light.
    struct SlowOnLight {
        seen: Mutex<Vec<Mode>>,
        slowed: Mutex<bool>,
    }

    impl ModeListener for SlowOnLight {
        fn name(&self) -> &str {
            "slow-on-light"
        }

        fn on_mode_changed(&self, mode: Mode) -> Result<()> {
            let mut slowed = self.slowed.lock().unwrap();
            if mode == Mode::Light && !*slowed {
                *slowed = true;
                drop(slowed);
                std::thread::sleep(Duration::from_millis(200));
            }
            self.seen.lock().unwrap().push(mode);
            Ok(())
        }
    }

    #[test]
    fn test_back_to_back_changes_apply_in_order() {
        let service = Service::new(Mode::Unknown);
        let listener = Arc::new(SlowOnLight {
            seen: Mutex::new(Vec::new()),
            slowed: Mutex::new(false),
        });
        service.add_listener(listener.clone()).unwrap();

        let light = service.change_mode(Mode::Light).unwrap();
        let dark = service.change_mode(Mode::Dark).unwrap();
        dark.wait();
        light.wait();

        assert_eq!(service.current_mode(), Mode::Dark);
        assert_eq!(*listener.seen.lock().unwrap(), vec![Mode::Light, Mode::Dark]);
    }

    #[test]
    fn test_late_listener_is_not_overtaken() {
        let service = Service::new(Mode::Light);
        let listener = Arc::new(SlowOnLight {
            seen: Mutex::new(Vec::new()),
            slowed: Mutex::new(false),
        });
        service.add_listener(listener.clone()).unwrap();
        service.change_mode(Mode::Dark).unwrap().wait();

        assert_eq!(*listener.seen.lock().unwrap(), vec![Mode::Light, Mode::Dark]);
    }

    #[test]
    fn test_slow_listener_does_not_block_caller() {
        let (release, gate_rx) = channel();
        let service = Service::new(Mode::Unknown);
        service
            .add_listener(Arc::new(Gate {
                release: Mutex::new(gate_rx),
            }))
            .unwrap();

        // Returns while the gate listener is still blocked
        let handle = service.change_mode(Mode::Light).unwrap();
        assert_eq!(handle.len(), 1);
        assert!(service.dispatcher().history().is_empty());

        release.send(()).unwrap();
        let outcomes = handle.wait();
        assert!(outcomes[0].is_success());
    }
}

#[cfg(test)]
mod cache_tests {
    use crate::core::Mode;
    use crate::geo::Location;
    use crate::service::ModeListener;
    use crate::service::cache::{LocationCache, ModeCache};
    use tempfile::tempdir;

    #[test]
    fn test_mode_cache_round_trip() {
        let dir = tempdir().unwrap();
        let cache = ModeCache::new(&dir.path().join("darkman"));
        assert_eq!(cache.read(), None);

        cache.on_mode_changed(Mode::Dark).unwrap();
        assert_eq!(cache.read(), Some(Mode::Dark));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("darkman/mode.txt")).unwrap(),
            "dark"
        );
    }

    #[test]
    fn test_mode_cache_rejects_anything_else() {
        let dir = tempdir().unwrap();
        let cache = ModeCache::new(dir.path());
        for junk in ["null", "DARK", "dim", ""] {
            std::fs::write(dir.path().join("mode.txt"), junk).unwrap();
            assert_eq!(cache.read(), None, "{junk:?} should not parse");
        }

        std::fs::write(dir.path().join("mode.txt"), "light\n").unwrap();
        assert_eq!(cache.read(), Some(Mode::Light));
    }

    #[test]
    fn test_location_cache() {
        let dir = tempdir().unwrap();
        let cache = LocationCache::new(dir.path());
        assert_eq!(cache.read(), None);

        let location = Location::new(-33.87, 151.21, 58.0);
        cache.write(&location).unwrap();
        assert_eq!(cache.read(), Some(location));

        std::fs::write(dir.path().join("location.json"), "{\"lat\": \"north\"}").unwrap();
        assert_eq!(cache.read(), None);
    }
}

#[cfg(test)]
mod scripts_tests {
    use crate::core::Mode;
    use crate::service::scripts::ScriptRunner;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_script(dir: &Path, mode: &str, name: &str, body: &str) {
        let scripts = dir.join("darkman").join(format!("{mode}-mode.d"));
        fs::create_dir_all(&scripts).unwrap();
        let path = scripts.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_later_directories_override_by_name() {
        let system = tempdir().unwrap();
        let user = tempdir().unwrap();
        write_script(system.path(), "dark", "10-gtk", "true");
        write_script(system.path(), "dark", "20-kitty", "true");
        write_script(user.path(), "dark", "10-gtk", "true");
        write_script(user.path(), "light", "10-gtk", "true");

        let runner =
            ScriptRunner::with_data_dirs(vec![system.path().to_path_buf(), user.path().to_path_buf()]);
        let scripts = runner.scripts_for(Mode::Dark);

        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].starts_with(user.path()));
        assert!(scripts[0].ends_with("10-gtk"));
        assert!(scripts[1].starts_with(system.path()));
    }

    #[test]
    fn test_run_executes_scripts_in_order() {
        let data = tempdir().unwrap();
        let log = data.path().join("log");
        write_script(data.path(), "light", "b", &format!("echo b >> {}", log.display()));
        write_script(data.path(), "light", "a", &format!("echo a >> {}", log.display()));

        let runner = ScriptRunner::with_data_dirs(vec![data.path().to_path_buf()]);
        runner.run(Mode::Light).unwrap();

        assert_eq!(fs::read_to_string(&log).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_failing_script_is_reported() {
        let data = tempdir().unwrap();
        write_script(data.path(), "dark", "broken", "exit 3");

        let runner = ScriptRunner::with_data_dirs(vec![data.path().to_path_buf()]);
        let err = runner.run(Mode::Dark).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_missing_directories_are_fine() {
        let runner = ScriptRunner::with_data_dirs(vec!["/nonexistent/darkman-test".into()]);
        assert!(runner.scripts_for(Mode::Dark).is_empty());
        assert!(runner.run(Mode::Dark).is_ok());
    }
}
