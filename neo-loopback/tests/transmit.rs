mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use common::{api, api_with, find, open, serial, FIRE, VCAN};
use neo_loopback::{LoopbackConfig, LoopbackDeviceConfig};
use rs_neo::{DeviceType, EventType, Message, NeoConfig, NeoError, NetId, NetworkType};
use rs_neo::raw::RawMessage;

fn kind(result: Result<(), NeoError>) -> Result<(), EventType> {
    result.map_err(|e| e.event_type())
}

/// Wait until `count` messages were echoed.
fn echoed(api: &rs_neo::NeoApi, device: &rs_neo::DeviceHandle, count: usize) -> anyhow::Result<Vec<Message>> {
    let mut messages = Vec::new();
    for _ in 0..50 {
        messages.extend(api.get_messages(device, count - messages.len(), Duration::from_millis(100))?);
        if messages.len() == count {
            break;
        }
    }
    Ok(messages)
}

#[test]
fn echo() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = open(&api, FIRE)?;
    api.go_online(&device)?;

    let request = Message::can(NetId::HSCAN, 0x7DF, &[0x02, 0x01, 0x0D]);
    api.transmit(&device, &request)?;
    let fd = Message::can(NetId::HSCAN2, 0x18DA_F110, &[0x55; 12])
        .with_extended(true)
        .with_fd(true);
    api.transmit_messages(&device, &[fd.clone()])?;

    let messages = echoed(&api, &device, 2)?;
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.is_transmit()));
    assert_eq!(messages[0].arbid(), Some(0x7DF));
    assert_eq!(messages[0].data(), &[0x02, 0x01, 0x0D]);
    assert_eq!(messages[1].netid(), NetId::HSCAN2);
    assert!(messages[1].is_can_fd() && messages[1].is_extended());
    assert_eq!(messages[1].data().len(), 12);
    assert!(messages[1].timestamp() > 0);
    Ok(())
}

#[test]
fn raw_transmit() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = open(&api, FIRE)?;
    api.go_online(&device)?;

    let message = Message::can(NetId::MSCAN, 0x123, &[1, 2, 3, 4]);
    let records = [RawMessage::from_message(&message)];
    unsafe { api.transmit_raw(&device, &records)? };

    let messages = echoed(&api, &device, 1)?;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].arbid(), Some(0x123));
    assert_eq!(messages[0].network_type(), NetworkType::Can);
    Ok(())
}

#[test]
fn transmit_rules() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = find(&api, FIRE)?;
    let frame = Message::can(NetId::HSCAN, 0x100, &[0; 8]);

    assert_eq!(kind(api.transmit(&device, &frame)), Err(EventType::DeviceCurrentlyClosed));
    api.open_device(&device)?;
    assert_eq!(kind(api.transmit(&device, &frame)), Err(EventType::DeviceCurrentlyOffline));
    api.go_online(&device)?;

    let foreign = Message::can(NetId::HSCAN3, 0x100, &[0; 8]);
    assert_eq!(kind(api.transmit(&device, &foreign)), Err(EventType::UnsupportedTXNetwork));

    let long = Message::can(NetId::HSCAN, 0x100, &[0; 9]);
    assert_eq!(kind(api.transmit(&device, &long)), Err(EventType::MessageMaxLengthExceeded));
    let too_long = Message::can(NetId::HSCAN, 0x100, &[0; 65]).with_fd(false);
    assert_eq!(kind(api.transmit(&device, &too_long)), Err(EventType::MessageMaxLengthExceeded));

    let counters = Message::can_error_count(NetId::HSCAN, 0, 0);
    assert_eq!(kind(api.transmit(&device, &counters)), Err(EventType::UnexpectedNetworkType));

    // a failing record stops the batch
    let batch = [frame.clone(), foreign, frame];
    assert_eq!(kind(api.transmit_messages(&device, &batch)), Err(EventType::UnsupportedTXNetwork));
    Ok(())
}

#[test]
fn fd_not_supported() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = open(&api, VCAN)?;
    api.go_online(&device)?;

    let fd = Message::can(NetId::HSCAN, 0x100, &[0; 16]).with_fd(true);
    assert_eq!(kind(api.transmit(&device, &fd)), Err(EventType::CANFDNotSupported));
    Ok(())
}

#[test]
fn transmit_buffer_full() -> anyhow::Result<()> {
    let mut slow = LoopbackDeviceConfig::new(serial(FIRE)?, DeviceType::Fire3, vec![NetId::HSCAN]);
    slow.tx_buffer = 1;
    slow.echo_delay_ms = 200;
    let (api, _) = api_with(NeoConfig::default(), LoopbackConfig { devices: vec![slow] })?;

    let device = open(&api, FIRE)?;
    api.go_online(&device)?;
    api.set_write_blocks(&device, false)?;

    let frame = Message::can(NetId::HSCAN, 0x100, &[0; 8]);
    let results = (0..4)
        .map(|_| kind(api.transmit(&device, &frame)))
        .collect::<Vec<_>>();
    assert!(results.contains(&Err(EventType::TransmitBufferFull)));

    // blocking writes wait for room
    api.set_write_blocks(&device, true)?;
    api.transmit(&device, &frame)?;
    api.transmit(&device, &frame)?;
    Ok(())
}

#[test]
fn transmit_from_callback() -> anyhow::Result<()> {
    let mut slow = LoopbackDeviceConfig::new(serial(FIRE)?, DeviceType::Fire3, vec![NetId::HSCAN]);
    slow.tx_buffer = 1;
    slow.echo_delay_ms = 20;
    let (api, _) = api_with(NeoConfig::default(), LoopbackConfig { devices: vec![slow] })?;
    let api = Arc::new(api);

    let device = open(&api, FIRE)?;
    api.go_online(&device)?;

    // answer the first request from inside the callback
    let replies = Arc::new(AtomicUsize::new(0));
    let weak = Arc::downgrade(&api);
    let counter = Arc::clone(&replies);
    api.add_message_callback(&device, move |message| {
        if message.arbid() != Some(0x100) {
            return;
        }
        if let Some(api) = weak.upgrade() {
            let reply = Message::can(NetId::HSCAN, 0x7E8, &[0x01]);
            if api.transmit(&device, &reply).is_ok() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    // a full buffer keeps the client waiting while the callback transmits
    let (done, finished) = mpsc::channel();
    let client = Arc::clone(&api);
    thread::spawn(move || {
        let result = (0x100..0x105)
            .try_for_each(|id| client.transmit(&device, &Message::can(NetId::HSCAN, id, &[0; 8])))
            .map_err(|e| e.event_type());
        let _ = done.send(result);
    });
    assert_eq!(finished.recv_timeout(Duration::from_secs(5))?, Ok(()));

    let messages = echoed(&api, &device, 6)?;
    assert_eq!(messages.len(), 6);
    assert_eq!(replies.load(Ordering::SeqCst), 1);
    assert_eq!(messages.iter().filter(|m| m.arbid() == Some(0x7E8)).count(), 1);
    Ok(())
}
