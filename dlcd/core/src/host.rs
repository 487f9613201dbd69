// Host-simulator services the device depends on: the physical address range
// check and a device table that fans bus writes out to attached LCDs.

use crate::device::Dlcd;
use crate::lcd_text::FrameSink;
use crate::{CoreError, Result};
use log::debug;

/// Width of the host's physical address bus.
pub const PHYS_ADDRESS_BITS: u32 = 36;
pub const PHYS_ADDRESS_LIMIT: u64 = 1 << PHYS_ADDRESS_BITS;

pub trait PhysicalSpace {
    fn contains(&self, address: u64) -> bool;
}

/// Physical addresses `0..limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalRange {
    limit: u64,
}

impl PhysicalRange {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl Default for PhysicalRange {
    fn default() -> Self {
        Self::new(PHYS_ADDRESS_LIMIT)
    }
}

impl PhysicalSpace for PhysicalRange {
    fn contains(&self, address: u64) -> bool {
        address < self.limit
    }
}

/// Attached LCD instances, in registration order.
///
/// Every physical write is offered to every device; each one ignores
/// addresses outside its own register block.
pub struct DeviceTable<S: FrameSink> {
    space: PhysicalRange,
    devices: Vec<Dlcd<S>>,
}

impl<S: FrameSink> DeviceTable<S> {
    pub fn new(space: PhysicalRange) -> Self {
        Self {
            space,
            devices: Vec::new(),
        }
    }

    pub fn space(&self) -> &PhysicalRange {
        &self.space
    }

    /// Runs `init` for a new device and attaches it.
    pub fn attach<T: AsRef<str>>(&mut self, tokens: &[T], sink: S) -> Result<&mut Dlcd<S>> {
        let name = tokens.first().map(|token| token.as_ref());
        if let Some(name) = name {
            if self.get(name).is_some() {
                return Err(CoreError::DuplicateDevice(name.to_string()));
            }
        }
        let device = Dlcd::init_with_sink(tokens, &self.space, sink)?;
        self.devices.push(device);
        let index = self.devices.len() - 1;
        Ok(&mut self.devices[index])
    }

    pub fn write32(&mut self, procno: u32, address: u64, value: u32) {
        for device in &mut self.devices {
            device.write32(procno, address, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Dlcd<S>> {
        self.devices.iter().find(|device| device.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Dlcd<S>> {
        self.devices.iter_mut().find(|device| device.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dlcd<S>> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Detaches one device, running its teardown hook.
    pub fn detach(&mut self, name: &str) -> Option<S> {
        let index = self.devices.iter().position(|device| device.name() == name)?;
        Some(self.devices.remove(index).done())
    }

    /// Tears down every device in registration order.
    pub fn teardown(self) -> Vec<S> {
        debug!("[dlcd] tearing down {} device(s)", self.devices.len());
        self.devices.into_iter().map(Dlcd::done).collect()
    }
}

impl<S: FrameSink> Default for DeviceTable<S> {
    fn default() -> Self {
        Self::new(PhysicalRange::default())
    }
}
