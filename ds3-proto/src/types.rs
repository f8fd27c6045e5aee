//! Controller data model: input snapshot, output snapshot and edge event.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Button state represented as a 17-bit field, in wire bit order.
///
/// Implements bitwise operators for ergonomic button manipulation.
///
/// # Example
///
/// ```
/// use ds3_proto::Buttons;
///
/// let buttons = Buttons::CROSS | Buttons::L1;
/// assert!(buttons.contains(Buttons::CROSS));
/// assert!(buttons.contains(Buttons::L1));
/// assert!(!buttons.contains(Buttons::CIRCLE));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u32);

impl Buttons {
    pub const SELECT: Self = Self(1 << 0);
    pub const L3: Self = Self(1 << 1);
    pub const R3: Self = Self(1 << 2);
    pub const START: Self = Self(1 << 3);

    pub const UP: Self = Self(1 << 4);
    pub const RIGHT: Self = Self(1 << 5);
    pub const DOWN: Self = Self(1 << 6);
    pub const LEFT: Self = Self(1 << 7);

    pub const L2: Self = Self(1 << 8);
    pub const R2: Self = Self(1 << 9);
    pub const L1: Self = Self(1 << 10);
    pub const R1: Self = Self(1 << 11);

    pub const TRIANGLE: Self = Self(1 << 12);
    pub const CIRCLE: Self = Self(1 << 13);
    pub const CROSS: Self = Self(1 << 14);
    pub const SQUARE: Self = Self(1 << 15);

    pub const PS: Self = Self(1 << 16);

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Every defined button.
    pub const ALL: Self = Self(0x0001_FFFF);

    /// Build from a raw value, discarding bits above the 17 defined buttons.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & Self::ALL.0)
    }

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Check if the given button is pressed (alias for contains).
    #[inline]
    #[must_use]
    pub const fn is_pressed(self, button: Buttons) -> bool {
        self.contains(button)
    }

    /// Set or clear button(s).
    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    /// Get the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    /// Complement within the 17 defined buttons.
    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0 & Self::ALL.0)
    }
}

/// Both analog sticks, zero-centred.
///
/// Range: [-128, 127] per axis. Also used for per-axis deltas.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sticks {
    pub lx: i8,
    pub ly: i8,
    pub rx: i8,
    pub ry: i8,
}

impl Sticks {
    #[must_use]
    pub const fn new(lx: i8, ly: i8, rx: i8, ry: i8) -> Self {
        Self { lx, ly, rx, ry }
    }

    pub const CENTERED: Self = Self::new(0, 0, 0, 0);
}

/// Pressure readings of the twelve pressure-sensitive buttons.
///
/// `T` is `u8` for readings (0-255) and `i8` for deltas between readings.
/// Field order matches the wire order.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogButtons<T = u8> {
    pub up: T,
    pub right: T,
    pub down: T,
    pub left: T,

    pub l2: T,
    pub r2: T,
    pub l1: T,
    pub r1: T,

    pub triangle: T,
    pub circle: T,
    pub cross: T,
    pub square: T,
}

impl<T: Copy> AnalogButtons<T> {
    /// Number of pressure-sensitive buttons.
    pub const COUNT: usize = 12;

    /// Build from values in wire order.
    #[must_use]
    pub const fn from_array(v: [T; 12]) -> Self {
        Self {
            up: v[0],
            right: v[1],
            down: v[2],
            left: v[3],
            l2: v[4],
            r2: v[5],
            l1: v[6],
            r1: v[7],
            triangle: v[8],
            circle: v[9],
            cross: v[10],
            square: v[11],
        }
    }

    /// Values in wire order.
    #[must_use]
    pub const fn to_array(&self) -> [T; 12] {
        [
            self.up,
            self.right,
            self.down,
            self.left,
            self.l2,
            self.r2,
            self.l1,
            self.r1,
            self.triangle,
            self.circle,
            self.cross,
            self.square,
        ]
    }
}

/// Charging cable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cable {
    Plugged,
    Unplugged,
    /// Value not documented for the controller.
    Unknown(u8),
}

impl Cable {
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0x02 => Self::Plugged,
            0x03 => Self::Unplugged,
            other => Self::Unknown(other),
        }
    }
}

/// Battery level or charging state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Battery {
    Shutdown,
    Dying,
    Low,
    High,
    Full,
    Charging,
    NotCharging,
    /// Value not documented for the controller.
    Unknown(u8),
}

impl Battery {
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0x01 => Self::Shutdown,
            0x02 => Self::Dying,
            0x03 => Self::Low,
            0x04 => Self::High,
            0x05 => Self::Full,
            0xEE => Self::Charging,
            0xF1 => Self::NotCharging,
            other => Self::Unknown(other),
        }
    }
}

/// Link the controller reports it is using.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Connection {
    Usb,
    Bluetooth,
}

/// Whether the rumble motors are currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RumbleStatus {
    On,
    Off,
}

/// Controller status block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub cable: Cable,
    pub battery: Battery,
    pub connection: Connection,
    pub rumbling: RumbleStatus,
}

impl Status {
    /// Bit of the connection byte set when the link is Bluetooth.
    pub const BLUETOOTH_MASK: u8 = 0x04;
    /// Bit of the connection byte set when the motors are NOT running.
    pub const NOT_RUMBLING_MASK: u8 = 0x02;

    /// Decode the three status bytes (cable, battery, connection).
    #[must_use]
    pub const fn from_bytes(cable: u8, battery: u8, connection: u8) -> Self {
        Self {
            cable: Cable::from_raw(cable),
            battery: Battery::from_raw(battery),
            connection: if connection & Self::BLUETOOTH_MASK != 0 {
                Connection::Bluetooth
            } else {
                Connection::Usb
            },
            rumbling: if connection & Self::NOT_RUMBLING_MASK != 0 {
                RumbleStatus::Off
            } else {
                RumbleStatus::On
            },
        }
    }
}

impl Default for Status {
    /// Status decoded from zeroed bytes.
    fn default() -> Self {
        Self::from_bytes(0, 0, 0)
    }
}

/// Motion sensors, zero-centred.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sensor {
    /// Accelerometer X.
    pub ax: i16,
    /// Accelerometer Y.
    pub ay: i16,
    /// Accelerometer Z.
    pub az: i16,
    /// Gyroscope Z.
    pub gz: i16,
}

/// Decoded state of the controller from one input report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSnapshot {
    pub buttons: Buttons,
    pub sticks: Sticks,
    #[cfg(not(feature = "skip-analog"))]
    pub analog: AnalogButtons,
    pub status: Status,
    #[cfg(not(feature = "skip-sensor"))]
    pub sensor: Sensor,
}

impl InputSnapshot {
    /// Snapshot with every field zeroed, used before the first report.
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// Rumble motor command.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rumble {
    pub right_duration: u8,
    pub right_intensity: u8,
    pub left_duration: u8,
    pub left_intensity: u8,
}

impl Rumble {
    #[must_use]
    pub const fn new(
        right_duration: u8,
        right_intensity: u8,
        left_duration: u8,
        left_intensity: u8,
    ) -> Self {
        Self {
            right_duration,
            right_intensity,
            left_duration,
            left_intensity,
        }
    }

    pub const OFF: Self = Self::new(0, 0, 0, 0);
}

/// Player-number lamp row, stored as the wire LED mask.
///
/// Bit 0 is reserved and always clear.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Leds(pub u8);

impl Leds {
    pub const LED1: Self = Self(1 << 1);
    pub const LED2: Self = Self(1 << 2);
    pub const LED3: Self = Self(1 << 3);
    pub const LED4: Self = Self(1 << 4);

    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0x1E);

    /// Build from the four lamp flags.
    #[must_use]
    pub fn from_flags(led1: bool, led2: bool, led3: bool, led4: bool) -> Self {
        let mut leds = Self::NONE;
        leds.set(Self::LED1, led1);
        leds.set(Self::LED2, led2);
        leds.set(Self::LED3, led3);
        leds.set(Self::LED4, led4);
        leds
    }

    /// Lamp for a 1-based player number, `None` outside 1..=4.
    #[must_use]
    pub const fn for_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::LED1),
            2 => Some(Self::LED2),
            3 => Some(Self::LED3),
            4 => Some(Self::LED4),
            _ => None,
        }
    }

    /// Build from a raw wire mask, clearing the reserved bits.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw & Self::ALL.0)
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, led: Leds) -> bool {
        (self.0 & led.0) == led.0
    }

    #[inline]
    pub fn set(&mut self, led: Leds, on: bool) {
        if on {
            self.0 |= led.0;
        } else {
            self.0 &= !led.0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl BitOr for Leds {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// What will be transmitted with the next output report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputSnapshot {
    pub rumble: Rumble,
    pub leds: Leds,
}

/// Difference between two consecutive input snapshots.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    /// Buttons newly pressed.
    pub button_down: Buttons,
    /// Buttons newly released.
    pub button_up: Buttons,
    /// Per-axis `cur - prev`, wrapping in 8 bits.
    pub stick_delta: Sticks,
    /// Per-button pressure `cur - prev`, wrapping in 8 bits.
    #[cfg(all(not(feature = "skip-analog"), not(feature = "skip-analog-changed")))]
    pub analog_delta: AnalogButtons<i8>,
}
