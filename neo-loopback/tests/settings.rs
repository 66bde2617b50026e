mod common;

use common::{api, api_with, find, open, serial, FIRE, VCAN};
use neo_loopback::{LoopbackConfig, LoopbackDeviceConfig};
use rs_neo::{DeviceHandle, DeviceType, EventType, IoType, NeoApi, NeoConfig, NeoError, NetId, NetworkType};

fn kind<T>(result: Result<T, NeoError>) -> Result<T, EventType> {
    result.map_err(|e| e.event_type())
}

/// Close the device and open it again, as after a power cycle.
fn reopen(api: &NeoApi, device: DeviceHandle) -> anyhow::Result<DeviceHandle> {
    api.close_device(&device)?;
    let device = find(api, device.serial().as_str())?;
    api.open_device(&device)?;
    Ok(device)
}

#[test]
fn read_structure() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = open(&api, FIRE)?;

    // header and three CAN channels
    assert_eq!(api.settings_read_structure(&device, None)?, 40);
    let structure = api.settings_structure(&device)?;
    assert_eq!(hex::encode(&structure[..4]), "01002800");

    let mut head = [0u8; 10];
    assert_eq!(api.settings_read_structure(&device, Some(&mut head))?, 10);
    assert_eq!(&head, &structure[..10]);
    let events = api.get_device_events(Some(&device), 10)?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), EventType::SettingsStructureTruncated);

    api.settings_refresh(&device)?;
    assert_eq!(api.settings_structure(&device)?, structure);
    Ok(())
}

#[test]
fn baudrates() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = open(&api, FIRE)?;

    assert_eq!(api.get_baudrate(&device, NetId::HSCAN)?, 500_000);
    api.set_baudrate(&device, NetId::HSCAN, 250_000)?;
    assert_eq!(api.get_baudrate(&device, NetId::HSCAN)?, 250_000);
    // the pending copy holds the change
    let structure = api.settings_structure(&device)?;
    assert_eq!(hex::encode(&structure[8..12]), "90d00300");

    // a refresh drops it, the device never saw it
    api.settings_refresh(&device)?;
    assert_eq!(api.get_baudrate(&device, NetId::HSCAN)?, 500_000);

    api.set_baudrate(&device, NetId::HSCAN, 250_000)?;
    api.settings_apply_temporary(&device)?;
    api.settings_refresh(&device)?;
    assert_eq!(api.get_baudrate(&device, NetId::HSCAN)?, 250_000);

    assert_eq!(kind(api.set_baudrate(&device, NetId::HSCAN, 12_345)), Err(EventType::BaudrateNotFound));
    assert_eq!(kind(api.get_baudrate(&device, NetId::LIN)), Err(EventType::CANSettingsNotAvailable));

    assert_eq!(api.get_fd_baudrate(&device, NetId::HSCAN2)?, 2_000_000);
    api.set_fd_baudrate(&device, NetId::HSCAN2, 5_000_000)?;
    assert_eq!(api.get_fd_baudrate(&device, NetId::HSCAN2)?, 5_000_000);
    assert_eq!(kind(api.set_fd_baudrate(&device, NetId::HSCAN2, 500_000)), Err(EventType::BaudrateNotFound));

    let vcan = open(&api, VCAN)?;
    assert_eq!(kind(api.get_fd_baudrate(&vcan, NetId::HSCAN)), Err(EventType::CANFDSettingsNotAvailable));
    Ok(())
}

#[test]
fn temporary_and_persistent() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = open(&api, FIRE)?;

    api.set_baudrate(&device, NetId::MSCAN, 125_000)?;
    api.settings_apply_temporary(&device)?;
    let device = reopen(&api, device)?;
    assert_eq!(api.get_baudrate(&device, NetId::MSCAN)?, 500_000);

    api.set_baudrate(&device, NetId::MSCAN, 125_000)?;
    api.settings_apply(&device)?;
    let device = reopen(&api, device)?;
    assert_eq!(api.get_baudrate(&device, NetId::MSCAN)?, 125_000);

    // defaults can be applied for this session only
    api.settings_apply_defaults_temporary(&device)?;
    assert_eq!(api.get_baudrate(&device, NetId::MSCAN)?, 500_000);
    let device = reopen(&api, device)?;
    assert_eq!(api.get_baudrate(&device, NetId::MSCAN)?, 125_000);

    api.settings_apply_defaults(&device)?;
    let device = reopen(&api, device)?;
    assert_eq!(api.get_baudrate(&device, NetId::MSCAN)?, 500_000);
    Ok(())
}

#[test]
fn apply_structure() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = open(&api, FIRE)?;
    let mut structure = api.settings_structure(&device)?;

    // baud rate of the first channel
    structure[8..12].copy_from_slice(&1_000_000u32.to_le_bytes());
    api.settings_apply_structure_temporary(&device, &structure)?;
    assert_eq!(api.get_baudrate(&device, NetId::HSCAN)?, 1_000_000);

    assert_eq!(kind(api.settings_apply_structure(&device, &structure[..20])), Err(EventType::SettingsStructureMismatch));

    let mut stale = structure.clone();
    stale[0] = 9;
    assert_eq!(kind(api.settings_apply_structure(&device, &stale)), Err(EventType::SettingsVersionError));
    // a rejected structure leaves the device settings alone
    assert_eq!(api.settings_structure(&device)?, structure);

    api.settings_apply_structure(&device, &structure)?;
    let device = reopen(&api, device)?;
    assert_eq!(api.get_baudrate(&device, NetId::HSCAN)?, 1_000_000);
    Ok(())
}

#[test]
fn settings_unavailable() -> anyhow::Result<()> {
    let mut plain = LoopbackDeviceConfig::new(serial(VCAN)?, DeviceType::Vcan42, vec![NetId::HSCAN]);
    plain.settings = false;
    let (api, _) = api_with(NeoConfig::default(), LoopbackConfig { devices: vec![plain] })?;

    let device = find(&api, VCAN)?;
    assert_eq!(kind(api.settings_refresh(&device)), Err(EventType::DeviceCurrentlyClosed));
    assert_eq!(kind(api.settings_read_structure(&device, None)), Err(EventType::DeviceCurrentlyClosed));

    // opening works without settings
    api.open_device(&device)?;
    assert_eq!(api.event_count(), 0);
    assert_eq!(kind(api.settings_read_structure(&device, None)), Err(EventType::SettingsNotAvailable));
    assert_eq!(kind(api.settings_apply(&device)), Err(EventType::SettingsNotAvailable));
    assert_eq!(kind(api.settings_apply_defaults(&device)), Err(EventType::SettingsNotAvailable));
    assert_eq!(kind(api.get_baudrate(&device, NetId::HSCAN)), Err(EventType::SettingsNotAvailable));
    assert_eq!(kind(api.set_baudrate(&device, NetId::HSCAN, 250_000)), Err(EventType::SettingsNotAvailable));
    Ok(())
}

#[test]
fn termination() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = find(&api, FIRE)?;

    assert!(api.is_termination_supported_for(&device, NetId::HSCAN));
    assert!(!api.is_termination_supported_for(&device, NetId::LIN));
    // closed devices never report being able to terminate
    assert!(!api.can_termination_be_enabled_for(&device, NetId::HSCAN));
    assert_eq!(kind(api.set_termination_for(&device, NetId::HSCAN, true)), Err(EventType::DeviceCurrentlyClosed));

    api.open_device(&device)?;
    assert!(api.can_termination_be_enabled_for(&device, NetId::HSCAN));
    api.set_termination_for(&device, NetId::HSCAN, true)?;
    // pending until applied
    assert!(!api.is_termination_enabled_for(&device, NetId::HSCAN)?);
    assert_eq!(api.settings_structure(&device)?[6], 1);

    // HSCAN and MSCAN share a termination group
    assert!(!api.can_termination_be_enabled_for(&device, NetId::MSCAN));
    assert_eq!(kind(api.set_termination_for(&device, NetId::MSCAN, true)), Err(EventType::AnotherInTerminationGroupEnabled));
    assert!(api.can_termination_be_enabled_for(&device, NetId::HSCAN2));
    api.set_termination_for(&device, NetId::HSCAN2, true)?;

    api.settings_apply_temporary(&device)?;
    assert!(api.is_termination_enabled_for(&device, NetId::HSCAN)?);
    assert!(api.is_termination_enabled_for(&device, NetId::HSCAN2)?);

    api.set_termination_for(&device, NetId::HSCAN, false)?;
    api.set_termination_for(&device, NetId::MSCAN, true)?;
    assert!(api.is_termination_enabled_for(&device, NetId::HSCAN)?);
    assert!(!api.is_termination_enabled_for(&device, NetId::MSCAN)?);

    // a refresh restores the applied group state
    api.settings_refresh(&device)?;
    assert!(!api.can_termination_be_enabled_for(&device, NetId::MSCAN));

    assert_eq!(kind(api.set_termination_for(&device, NetId::LIN, true)), Err(EventType::TerminationNotSupportedNetwork));
    assert_eq!(kind(api.is_termination_enabled_for(&device, NetId::ETHERNET)), Err(EventType::TerminationNotSupportedNetwork));

    let vcan = open(&api, VCAN)?;
    assert!(!api.is_termination_supported_for(&vcan, NetId::HSCAN));
    assert_eq!(kind(api.set_termination_for(&vcan, NetId::HSCAN, true)), Err(EventType::TerminationNotSupportedDevice));
    Ok(())
}

#[test]
fn hardware_queries() -> anyhow::Result<()> {
    let (api, _) = api()?;
    let device = find(&api, FIRE)?;

    assert_eq!(api.get_networks(&device)?.len(), 5);
    assert_eq!(api.get_network_by_number(&device, NetworkType::Can, 2)?, NetId::MSCAN);
    assert_eq!(api.get_network_by_number(&device, NetworkType::Can, 4)?, NetId::INVALID);
    assert_eq!(api.get_network_by_number(&device, NetworkType::Ethernet, 1)?, NetId::ETHERNET);
    assert_eq!(api.get_timestamp_resolution(&device)?, 25);

    assert_eq!(kind(api.get_digital_io(&device, IoType::Misc, 1)), Err(EventType::DeviceCurrentlyClosed));
    api.open_device(&device)?;
    for pin in 1..=6 {
        assert!(!api.get_digital_io(&device, IoType::Misc, pin)?);
    }
    api.set_digital_io(&device, IoType::Misc, 3, true)?;
    assert!(api.get_digital_io(&device, IoType::Misc, 3)?);
    assert!(!api.get_digital_io(&device, IoType::Misc, 2)?);
    api.set_digital_io(&device, IoType::Misc, 3, false)?;
    assert!(!api.get_digital_io(&device, IoType::Misc, 3)?);

    assert_eq!(kind(api.get_digital_io(&device, IoType::Misc, 7)), Err(EventType::ParameterOutOfRange));
    assert_eq!(kind(api.get_digital_io(&device, IoType::Misc, 0)), Err(EventType::ParameterOutOfRange));
    Ok(())
}
