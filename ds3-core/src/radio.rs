//! Radio bring-up and tear-down sequencing.
//!
//! The radio itself is external. [`Radio`] exposes the primitive operations
//! of the controller, the host stack and the persistent store; [`bring_up`]
//! and [`tear_down`] run them in the order the controller expects and stop at
//! the first failure.

/// Error code reported by a radio primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioFault(pub i32);

/// Outcome of initialising the persistent store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvsError {
    /// No free pages left; the store must be erased.
    NoFreePages,
    /// The store was written by a newer layout; the store must be erased.
    NewVersionFound,
    Fault(RadioFault),
}

/// Bluetooth controller operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BtMode {
    /// BR/EDR only, BLE memory released.
    Classic,
    /// BR/EDR and BLE.
    Dual,
}

impl Default for BtMode {
    fn default() -> Self {
        if cfg!(feature = "bt-dual-mode") {
            Self::Dual
        } else {
            Self::Classic
        }
    }
}

/// Inquiry and page scan settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanMode {
    pub connectable: bool,
    pub discoverable: bool,
}

impl ScanMode {
    /// Paired controllers can connect; nobody can find us.
    pub const CONNECTABLE_HIDDEN: Self = Self {
        connectable: true,
        discoverable: false,
    };
}

/// Name advertised by the host.
pub const DEFAULT_DEVICE_NAME: &str = "PS3 Host";

/// Runtime radio configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostConfig {
    pub device_name: &'static str,
    pub mode: BtMode,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME,
            mode: BtMode::default(),
        }
    }
}

/// Step of the radio lifecycle, carried by [`RadioError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioStep {
    NvsInit,
    NvsErase,
    ReleaseBleMemory,
    ControllerInit,
    ControllerEnable,
    HostInit,
    HostEnable,
    SetDeviceName,
    SetScanMode,
    HostDisable,
    HostDeinit,
    ControllerDisable,
    ControllerDeinit,
    SetBaseMac,
}

impl RadioStep {
    const fn as_str(self) -> &'static str {
        match self {
            Self::NvsInit => "nvs init",
            Self::NvsErase => "nvs erase",
            Self::ReleaseBleMemory => "release BLE memory",
            Self::ControllerInit => "controller init",
            Self::ControllerEnable => "controller enable",
            Self::HostInit => "host init",
            Self::HostEnable => "host enable",
            Self::SetDeviceName => "set device name",
            Self::SetScanMode => "set scan mode",
            Self::HostDisable => "host disable",
            Self::HostDeinit => "host deinit",
            Self::ControllerDisable => "controller disable",
            Self::ControllerDeinit => "controller deinit",
            Self::SetBaseMac => "set base MAC",
        }
    }
}

/// A radio step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioError {
    pub step: RadioStep,
    pub fault: RadioFault,
}

impl RadioError {
    #[must_use]
    pub const fn new(step: RadioStep, fault: RadioFault) -> Self {
        Self { step, fault }
    }
}

impl core::fmt::Display for RadioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} failed (code {})", self.step.as_str(), self.fault.0)
    }
}

/// Primitive operations of the radio, its host stack and persistent store.
pub trait Radio {
    fn nvs_init(&mut self) -> Result<(), NvsError>;
    fn nvs_erase(&mut self) -> Result<(), RadioFault>;

    /// Give the BLE controller memory back to the heap.
    fn release_ble_memory(&mut self) -> Result<(), RadioFault>;

    fn controller_init(&mut self) -> Result<(), RadioFault>;
    fn controller_enable(&mut self, mode: BtMode) -> Result<(), RadioFault>;
    fn controller_disable(&mut self) -> Result<(), RadioFault>;
    fn controller_deinit(&mut self) -> Result<(), RadioFault>;

    fn host_init(&mut self) -> Result<(), RadioFault>;
    fn host_enable(&mut self) -> Result<(), RadioFault>;
    fn host_disable(&mut self) -> Result<(), RadioFault>;
    fn host_deinit(&mut self) -> Result<(), RadioFault>;

    fn set_device_name(&mut self, name: &str) -> Result<(), RadioFault>;
    fn set_scan_mode(&mut self, mode: ScanMode) -> Result<(), RadioFault>;

    /// Program the base MAC the Bluetooth address is derived from.
    fn set_base_mac(&mut self, mac: &[u8; 6]) -> Result<(), RadioFault>;
}

/// Attach the failed step and log it.
fn step<T>(at: RadioStep, result: Result<T, RadioFault>) -> Result<T, RadioError> {
    result.map_err(|fault| {
        error!("radio: {:?} failed with code {}", at, fault.0);
        RadioError::new(at, fault)
    })
}

/// Reported when the store still needs an erase after one erase.
const NVS_STILL_UNUSABLE: RadioFault = RadioFault(-1);

fn init_nvs<R: Radio>(radio: &mut R) -> Result<(), RadioError> {
    match radio.nvs_init() {
        Ok(()) => Ok(()),
        Err(NvsError::NoFreePages | NvsError::NewVersionFound) => {
            warn!("radio: nvs needs erase, retrying");
            step(RadioStep::NvsErase, radio.nvs_erase())?;
            match radio.nvs_init() {
                Ok(()) => Ok(()),
                Err(NvsError::Fault(fault)) => step(RadioStep::NvsInit, Err(fault)),
                Err(_) => step(RadioStep::NvsInit, Err(NVS_STILL_UNUSABLE)),
            }
        }
        Err(NvsError::Fault(fault)) => step(RadioStep::NvsInit, Err(fault)),
    }
}

/// Bring the radio up and make the host connectable.
///
/// If a step fails, the controller and host steps already taken are undone,
/// newest first, before the error is returned.
pub fn bring_up<R: Radio>(radio: &mut R, config: &HostConfig) -> Result<(), RadioError> {
    init_nvs(radio)?;
    if config.mode == BtMode::Classic {
        step(RadioStep::ReleaseBleMemory, radio.release_ble_memory())?;
    }

    let mut reached = Reached::Nothing;
    if let Err(e) = start(radio, config, &mut reached) {
        unwind(radio, reached);
        return Err(e);
    }
    info!("radio: up as {:?}", config.device_name);
    Ok(())
}

/// Last lifecycle step that completed during [`bring_up`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Reached {
    Nothing,
    ControllerInit,
    ControllerEnable,
    HostInit,
    HostEnable,
}

fn start<R: Radio>(radio: &mut R, config: &HostConfig, reached: &mut Reached) -> Result<(), RadioError> {
    step(RadioStep::ControllerInit, radio.controller_init())?;
    *reached = Reached::ControllerInit;
    step(RadioStep::ControllerEnable, radio.controller_enable(config.mode))?;
    *reached = Reached::ControllerEnable;
    step(RadioStep::HostInit, radio.host_init())?;
    *reached = Reached::HostInit;
    step(RadioStep::HostEnable, radio.host_enable())?;
    *reached = Reached::HostEnable;
    step(RadioStep::SetDeviceName, radio.set_device_name(config.device_name))?;
    step(
        RadioStep::SetScanMode,
        radio.set_scan_mode(ScanMode::CONNECTABLE_HIDDEN),
    )?;
    Ok(())
}

/// Undo everything up to `reached`. Failures are logged and the rest is
/// still attempted.
fn unwind<R: Radio>(radio: &mut R, reached: Reached) {
    if reached >= Reached::HostEnable {
        let _ = step(RadioStep::HostDisable, radio.host_disable());
    }
    if reached >= Reached::HostInit {
        let _ = step(RadioStep::HostDeinit, radio.host_deinit());
    }
    if reached >= Reached::ControllerEnable {
        let _ = step(RadioStep::ControllerDisable, radio.controller_disable());
    }
    if reached >= Reached::ControllerInit {
        let _ = step(RadioStep::ControllerDeinit, radio.controller_deinit());
    }
    warn!("radio: bring-up rolled back from {:?}", reached);
}

/// Shut the host stack and controller down.
pub fn tear_down<R: Radio>(radio: &mut R) -> Result<(), RadioError> {
    step(RadioStep::HostDisable, radio.host_disable())?;
    step(RadioStep::HostDeinit, radio.host_deinit())?;
    step(RadioStep::ControllerDisable, radio.controller_disable())?;
    step(RadioStep::ControllerDeinit, radio.controller_deinit())?;
    info!("radio: down");
    Ok(())
}

/// Base MAC that yields `bt_mac` as the Bluetooth address.
///
/// The radio derives its Bluetooth address as base + 2 on the last octet.
#[must_use]
pub fn base_mac_for(bt_mac: &[u8; 6]) -> [u8; 6] {
    let mut base = *bt_mac;
    base[5] = base[5].wrapping_sub(2);
    base
}
