mod common;

use std::sync::{Arc, Mutex};
use std::thread;
use common::{api, find, open, serial, FIRE, VCAN};
use rand::Rng;
use rs_neo::{EventType, Severity};

#[test]
fn event_limit() -> anyhow::Result<()> {
    let (api, finder) = api()?;
    let device = open(&api, FIRE)?;
    let injector = finder.injector(serial(FIRE)?)
        .ok_or_else(|| anyhow::anyhow!("no injector"))?;

    assert_eq!(api.get_event_limit(), 10_000);
    assert_eq!(api.set_event_limit(10).map_err(|e| e.event_type()), Err(EventType::ParameterOutOfRange));
    assert_eq!(api.get_event_limit(), 10_000);

    let limit = rand::rng().random_range(11..50);
    api.set_event_limit(limit)?;
    for _ in 0..limit * 2 {
        injector.report(EventType::SettingsDefaultsUsed, Severity::Info);
    }
    assert_eq!(api.event_count(), limit);
    assert_eq!(api.device_event_count(Some(&device))?, limit - 1);

    let events = api.get_events(limit * 2);
    assert_eq!(events.len(), limit);
    assert_eq!(events.last().map(|e| e.event_type()), Some(EventType::TooManyEvents));
    assert!(events[..limit - 1].iter().all(|e| e.serial() == Some(device.serial())));
    // only the newest events survive
    assert!(events[..limit - 1].windows(2).all(|w| w[0].number() < w[1].number()));
    assert_eq!(api.event_count(), 0);
    Ok(())
}

#[test]
fn shrink_event_limit() -> anyhow::Result<()> {
    let (api, finder) = api()?;
    open(&api, FIRE)?;
    let injector = finder.injector(serial(FIRE)?)
        .ok_or_else(|| anyhow::anyhow!("no injector"))?;

    for _ in 0..30 {
        injector.report(EventType::PollingMessageOverflow, Severity::Warning);
    }
    api.set_event_limit(20)?;
    assert_eq!(api.event_count(), 20);

    let events = api.get_events(100);
    assert_eq!(events.iter().filter(|e| e.event_type() == EventType::TooManyEvents).count(), 1);
    Ok(())
}

#[test]
fn device_filters() -> anyhow::Result<()> {
    let (api, finder) = api()?;
    let fire = open(&api, FIRE)?;
    let vcan = open(&api, VCAN)?;

    let report = |s: &str, kind: EventType| -> anyhow::Result<()> {
        finder.injector(serial(s)?)
            .and_then(|i| i.report(kind, Severity::Warning))
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("{} is not open", s))
    };
    report(FIRE, EventType::PollingMessageOverflow)?;
    report(VCAN, EventType::DeviceFirmwareOutOfDate)?;
    report(FIRE, EventType::NoDeviceResponse)?;

    // an API level warning
    let mut short = [0u8; 4];
    api.get_product_name_for_type(fire.device_type(), Some(&mut short));

    assert_eq!(api.event_count(), 4);
    assert_eq!(api.device_event_count(Some(&fire))?, 2);
    assert_eq!(api.device_event_count(None)?, 1);

    let vcan_events = api.get_device_events(Some(&vcan), 10)?;
    assert_eq!(vcan_events.len(), 1);
    assert_eq!(vcan_events[0].event_type(), EventType::DeviceFirmwareOutOfDate);
    assert!(vcan_events[0].to_string().starts_with("RS2259 warning: DeviceFirmwareOutOfDate"));
    // reading the device events removed them
    assert_eq!(api.device_event_count(Some(&vcan))?, 0);
    assert_eq!(api.event_count(), 3);

    api.discard_device_events(Some(&fire))?;
    assert_eq!(api.event_count(), 1);
    let api_events = api.get_device_events(None, 10)?;
    assert_eq!(api_events[0].event_type(), EventType::OutputTruncated);
    assert_eq!(api_events[0].serial(), None);

    api.close_device(&vcan)?;
    assert_eq!(api.get_device_events(Some(&vcan), 10).map_err(|e| e.event_type()), Err(EventType::InvalidNeoDevice));

    report(FIRE, EventType::NoDeviceResponse)?;
    api.discard_all_events();
    assert_eq!(api.event_count(), 0);
    Ok(())
}

#[test]
fn errors_are_per_thread() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let api = Arc::new(api);
    let device = find(&api, FIRE)?;

    // an error raised on another thread
    let other = Arc::clone(&api);
    let seen = thread::spawn(move || {
        let _ = other.go_online(&device);
        other.get_last_error().map(|e| e.event_type())
    })
    .join()
    .map_err(|_| anyhow::anyhow!("thread panicked"))?;
    assert_eq!(seen, Some(EventType::DeviceCurrentlyClosed));
    assert!(api.get_last_error().is_none());

    // the latest error wins
    let _ = api.go_online(&device);
    let _ = api.close_device(&device);
    let _ = api.set_event_limit(3);
    assert_eq!(api.get_last_error().map(|e| e.event_type()), Some(EventType::ParameterOutOfRange));
    assert!(api.get_last_error().is_none());
    Ok(())
}

#[test]
fn event_callbacks() -> anyhow::Result<()> {
    let (api, finder) = api()?;
    let device = open(&api, FIRE)?;
    let injector = finder.injector(serial(FIRE)?)
        .ok_or_else(|| anyhow::anyhow!("no injector"))?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::clone(&seen);
    let id = api.add_event_callback(move |e| {
        if let Ok(mut events) = events.lock() {
            events.push((e.event_type(), e.severity()));
        }
    });

    injector.report(EventType::NoDeviceResponse, Severity::Info);
    let _ = api.open_device(&device);
    assert_eq!(
        seen.lock().map(|v| v.clone()).unwrap_or_default(),
        vec![
            (EventType::NoDeviceResponse, Severity::Info),
            (EventType::DeviceCurrentlyOpen, Severity::Error),
        ],
    );

    assert!(api.remove_event_callback(id));
    assert!(!api.remove_event_callback(id));
    injector.report(EventType::NoDeviceResponse, Severity::Info);
    assert_eq!(seen.lock().map(|v| v.len()).unwrap_or_default(), 2);
    Ok(())
}
