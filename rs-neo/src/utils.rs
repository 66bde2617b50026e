use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{MAX_FD_FRAME_SIZE, MAX_FRAME_SIZE};

/// Padded payload length of a CAN frame, `None` when it does not fit.
#[inline]
pub fn can_dlc(length: usize, fd: bool) -> Option<usize> {
    if fd {
        match length {
            ..=MAX_FRAME_SIZE => Some(length),
            9..=12 =>  Some(12),
            13..=16 => Some(16),
            17..=20 => Some(20),
            21..=24 => Some(24),
            25..=32 => Some(32),
            33..=48 => Some(48),
            49..=MAX_FD_FRAME_SIZE => Some(64),
            _ => None,
        }
    }
    else {
        match length {
            ..=MAX_FRAME_SIZE => Some(length),
            _ => None,
        }
    }
}

/// The 4-bit DLC code sent on the wire for a payload length.
#[inline]
pub fn length_to_dlc_code(length: usize, fd: bool) -> Option<u8> {
    let padded = can_dlc(length, fd)?;
    Some(match padded {
        ..=MAX_FRAME_SIZE => padded as u8,
        12 => 9,
        16 => 10,
        20 => 11,
        24 => 12,
        32 => 13,
        48 => 14,
        _ => 15,
    })
}

/// Payload length encoded by a wire DLC code.
#[inline]
pub fn dlc_code_to_length(dlc: u8, fd: bool) -> usize {
    match (dlc, fd) {
        (0..=8, _) => dlc as usize,
        (_, false) => MAX_FRAME_SIZE,
        (9, true) => 12,
        (10, true) => 16,
        (11, true) => 20,
        (12, true) => 24,
        (13, true) => 32,
        (14, true) => 48,
        _ => MAX_FD_FRAME_SIZE,
    }
}

#[inline]
pub fn system_timestamp() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(v) => v.as_nanos() as u64,
        Err(e) => {
            log::warn!("RUST-NEO - SystemTimeError: {0} when conversion failed!", e);
            0
        }
    }
}

/// Copy `src` into `dst` as a NUL terminated C string.
///
/// At most `dst.len() - 1` characters are written. Returns the number of
/// characters written and whether the output was truncated.
pub fn copy_c_string(src: &str, dst: &mut [u8]) -> (usize, bool) {
    let Some(room) = dst.len().checked_sub(1) else {
        return (0, !src.is_empty());
    };

    let count = src.len().min(room);
    dst[..count].copy_from_slice(&src.as_bytes()[..count]);
    dst[count] = 0;

    (count, count < src.len())
}

#[inline]
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock()
        .unwrap_or_else(|e| {
            log::warn!("RUST-NEO - {} mutex is poisoned", what);
            e.into_inner()
        })
}

#[inline]
pub(crate) fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    lock.read()
        .unwrap_or_else(|e| {
            log::warn!("RUST-NEO - {} lock is poisoned when reading", what);
            e.into_inner()
        })
}

#[inline]
pub(crate) fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    lock.write()
        .unwrap_or_else(|e| {
            log::warn!("RUST-NEO - {} lock is poisoned when writing", what);
            e.into_inner()
        })
}
