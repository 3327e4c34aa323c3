// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! ARM SWD Interface
//!
//! This module implements the SWD session for communicating with ARM
//! devices.  It provides `SwdInterface` for performing SWD operations, and
//! `SwdOp` for describing low-level SWD operations.

use core::fmt;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};

use peerdap_core::arm::Reg;
use peerdap_core::arm::dp::{
    IdCode, IdCodeRegister, RdBuffRegister, Select, SelectRegister, TargetSel,
};
use peerdap_core::arm::register::{ApRegister, DpRegister, ReadableRegister, WritableRegister};

use crate::SwdError;
use crate::pins::{Delay, Direction, Gpio};
use crate::protocol::{
    POST_SEQUENCE_IDLE, Speed, SwdProtocol, TARGETSEL_REQUEST, calculate_parity, request,
};

/// Number of attempts made at an operation the target keeps answering WAIT
/// to, before giving up with [`SwdError::Stalled`].
pub const DEFAULT_MAX_WAIT_ACK_ATTEMPTS: u32 = 32;

/// Runtime configuration for an [`SwdInterface`].
///
/// Missing fields take their default when deserialized, so a stored
/// configuration can be partial:
///
/// ```text
/// {"speed":"Slow"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwdConfig {
    /// SWCLK speed
    pub speed: Speed,

    /// Adds clockless pauses between the phases of each transaction.  Purely
    /// to make captures easier to read.
    pub idle_padding: bool,

    /// Total attempts at an operation that is answered with WAIT.  Values
    /// below 1 are treated as 1.
    pub max_wait_attempts: u32,
}

impl Default for SwdConfig {
    fn default() -> Self {
        Self {
            speed: Speed::default(),
            idle_padding: false,
            max_wait_attempts: DEFAULT_MAX_WAIT_ACK_ATTEMPTS,
        }
    }
}

/// SWD Interface object
///
/// This is the session.  It owns the SWD bus from [`Self::init()`] until
/// [`Self::disconnect()`], and performs individual register accesses on the
/// target.  Most applications will prefer to use
/// [`crate::DebugInterface`], which adds memory access on top.
///
/// Bringing up the link always follows the same order:
///
/// ```ignore
/// let mut swd_if = SwdInterface::init(gpio, SpinDelay, SWDIO, SWCLK, SwdConfig::default());
///
/// swd_if.reset();
/// swd_if.select_target(TARGET_SEL_RP2040_CORE0); // multidrop targets only
/// let idcode = swd_if.read_idcode()?;            // mandatory after reset
/// ```
///
/// DP SELECT is never changed behind the caller's back.  Before accessing a
/// banked register, write SELECT, either through [`Self::set_reg()`] or
/// [`Self::write_dp_register()`].  The last value written is available from
/// [`Self::select()`].
pub struct SwdInterface<G: Gpio, D: Delay> {
    protocol: SwdProtocol<G, D>,
    max_wait_attempts: u32,
    dp_select: Option<Select>,
}

impl<G: Gpio, D: Delay> SwdInterface<G, D> {
    /// Claims the SWD pins and creates the session.
    ///
    /// Arguments:
    /// - `gpio`: GPIO capability used to drive both pins.
    /// - `delay`: Delay capability used to time SWCLK.
    /// - `swdio`: SWDIO pin.  Idles as an output driven low, with the
    ///   pull-up enabled.
    /// - `swclk`: SWCLK pin.  Idles as an output driven high.
    /// - `config`: Initial configuration.
    ///
    /// Nothing is sent to the target.  Call [`Self::reset()`] next.
    pub fn init(gpio: G, delay: D, swdio: G::Pin, swclk: G::Pin, config: SwdConfig) -> Self {
        trace!("Exec:  Init {config:?}");
        let protocol =
            SwdProtocol::new(gpio, delay, swdio, swclk, config.speed, config.idle_padding);
        Self {
            protocol,
            max_wait_attempts: config.max_wait_attempts.max(1),
            dp_select: None,
        }
    }

    /// Releases both pins to inputs and returns the capabilities.
    pub fn disconnect(self) -> (G, D) {
        trace!("Exec:  Disconnect");
        self.protocol.release()
    }

    /// Current configuration.
    pub fn config(&self) -> SwdConfig {
        SwdConfig {
            speed: self.protocol.speed(),
            idle_padding: self.protocol.idle_padding(),
            max_wait_attempts: self.max_wait_attempts,
        }
    }

    /// Sets the SWD speed for this interface.
    ///
    /// Can be changed at any time.  For example, if [`Self::read_idcode()`]
    /// fails after a reset, retry with a slower speed.
    pub fn set_speed(&mut self, speed: Speed) {
        trace!("Exec:  Set {speed:?}");
        self.protocol.set_speed(speed);
    }

    pub fn speed(&self) -> Speed {
        self.protocol.speed()
    }

    pub fn set_idle_padding(&mut self, enabled: bool) {
        self.protocol.set_idle_padding(enabled);
    }

    /// Sets how many attempts are made at an operation the target answers
    /// WAIT to.  0 is treated as 1.
    pub fn set_max_wait_attempts(&mut self, attempts: u32) {
        self.max_wait_attempts = attempts.max(1);
    }

    /// The DP SELECT value most recently written, or `None` if it has not
    /// been written since the last [`Self::reset()`].
    pub fn select(&self) -> Option<Select> {
        self.dp_select
    }

    /// Access to the bit-level protocol, for sending custom sequences.
    pub fn protocol(&mut self) -> &mut SwdProtocol<G, D> {
        &mut self.protocol
    }

    /// Brings the link up from any state.
    ///
    /// Sends a line reset, the dormant-to-SWD wake sequence, and a second
    /// line reset.  Targets that are already in SWD mode ignore the wake
    /// sequence, so this works for both SWD v1 and v2 targets.
    ///
    /// The target then requires either a TARGETSEL write (multidrop targets,
    /// see [`Self::select_target()`]) or an IDCODE read before it will accept
    /// anything else.
    pub fn reset(&mut self) {
        trace!("Exec:  Reset SWD");
        self.protocol.line_reset();
        self.protocol.dormant_to_swd();
        self.protocol.line_reset();
        self.dp_select = None;
        trace!("OK:    Reset SWD");
    }

    /// Selects one target on a multidrop bus, by writing TARGETSEL.
    ///
    /// Must directly follow [`Self::reset()`], and be followed by
    /// [`Self::read_idcode()`].  Targets never drive the ACK of this
    /// request, so it cannot fail here.  If no target matched, the
    /// following IDCODE read returns [`SwdError::NoAck`].
    pub fn select_target(&mut self, target: impl Into<TargetSel>) {
        let target = target.into();
        trace!("Exec:  Select target {target}");

        let p = &mut self.protocol;
        p.idle(POST_SEQUENCE_IDLE);
        p.write(TARGETSEL_REQUEST as u32, 8);
        p.idle(2);
        p.turn(Direction::Input);
        let _ack = p.read(3);
        p.turn(Direction::Output);
        p.idle(2);
        p.write(target.data(), 32);
        p.idle(1);
        p.write(calculate_parity(target.data()) as u32, 1);
        p.idle(2);

        trace!("OK:    Select target {target}");
    }

    /// Reads the DP IDCODE register.  After a reset this is required to take
    /// the target out of the reset state.
    pub fn read_idcode(&mut self) -> Result<IdCode, SwdError> {
        let idcode = self.read_dp_register(IdCodeRegister)?;
        debug!("Value: IDCODE {idcode:#}");
        Ok(idcode)
    }

    /// Clocks 8 cycles without framing, letting the target finish any
    /// internal processing of the previous transaction.
    pub fn noop(&mut self) {
        trace!("Exec:  No-op");
        self.protocol.clock(8);
    }

    /// Reads a DP or AP register by address.
    ///
    /// AP reads are pipelined: the value returned is the result of the
    /// previous AP read, and the result of this one must be collected from
    /// DP RDBUFF, or from the next AP read.
    ///
    /// A failed read has no value.  Use [`crate::OrSentinel`] to collapse it
    /// to [`crate::SENTINEL`].
    pub fn get_reg(&mut self, reg: Reg) -> Result<u32, SwdError> {
        self.do_read_op(SwdOp::Read(reg))
    }

    /// Writes a DP or AP register by address.
    pub fn set_reg(&mut self, reg: Reg, value: u32) -> Result<(), SwdError> {
        self.do_write_op(SwdOp::Write(reg), value)?;
        if reg == SelectRegister::REG {
            self.dp_select = Some(Select::new(value));
        }
        Ok(())
    }

    /// Write a Debug Port register
    ///
    /// ```ignore
    /// use peerdap_core::arm::dp::{Abort, AbortRegister};
    /// swd_if.write_dp_register(AbortRegister, Abort::clear_all())?;
    /// ```
    pub fn write_dp_register<R>(&mut self, _reg: R, value: R::Value) -> Result<(), SwdError>
    where
        R: WritableRegister + DpRegister,
        u32: From<R::Value>,
    {
        self.set_reg(R::REG, R::to_raw(value))
    }

    /// Read a Debug Port register
    ///
    /// ```ignore
    /// use peerdap_core::arm::dp::CtrlStatRegister;
    /// let status = swd_if.read_dp_register(CtrlStatRegister)?;
    /// ```
    pub fn read_dp_register<R>(&mut self, _reg: R) -> Result<R::Value, SwdError>
    where
        R: ReadableRegister + DpRegister,
        R::Value: From<u32>,
    {
        let data = self.get_reg(R::REG)?;
        Ok(R::from_raw(data))
    }

    /// Write an Access Port register.  The bank containing the register must
    /// already be selected.
    ///
    /// ```ignore
    /// use peerdap_core::arm::map::{Tar, TarRegister};
    /// swd_if.write_ap_register(TarRegister, Tar::from(0x2000_0000))?;
    /// ```
    pub fn write_ap_register<R>(&mut self, _reg: R, value: R::Value) -> Result<(), SwdError>
    where
        R: WritableRegister + ApRegister,
        u32: From<R::Value>,
    {
        self.set_reg(R::REG, R::to_raw(value))
    }

    /// Read an Access Port register.  The bank containing the register must
    /// already be selected.
    ///
    /// Reads the AP register, then DP RDBUFF to collect the result, so unlike
    /// [`Self::get_reg()`] the value returned is that of this register.
    pub fn read_ap_register<R>(&mut self, _reg: R) -> Result<R::Value, SwdError>
    where
        R: ReadableRegister + ApRegister,
        R::Value: From<u32>,
    {
        let _stale = self.get_reg(R::REG)?;
        let data = self.get_reg(RdBuffRegister::REG)?;
        Ok(R::from_raw(data))
    }

    /// Writes DP SELECT.
    pub fn update_dp_select(&mut self, select: Select) -> Result<(), SwdError> {
        trace!("Exec:  SELECT {}", select.selection_info());
        self.write_dp_register(SelectRegister, select)
    }
}

// Internal functions
impl<G: Gpio, D: Delay> SwdInterface<G, D> {
    // Repeats `attempt` for as long as the target answers WAIT, up to the
    // configured number of attempts.
    fn with_wait_retry<T>(
        &mut self,
        op: SwdOp,
        mut attempt: impl FnMut(&mut SwdProtocol<G, D>) -> Result<T, SwdError>,
    ) -> Result<T, SwdError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt(&mut self.protocol) {
                Err(SwdError::WaitAck) => trace!("Wait:  {op}"),
                result => break result,
            }

            if attempts >= self.max_wait_attempts {
                warn!("{op} stalled, WAIT after {attempts} attempts");
                break Err(SwdError::Stalled(attempts));
            }
            trace!("Retry: {op} {attempts}");
        }
    }

    fn do_write_op(&mut self, op: SwdOp, data: u32) -> Result<(), SwdError> {
        let cmd = op.to_cmd();
        trace!("Exec:  {op} SWD: {cmd:#04X} {data:#010X}");

        let result = self.with_wait_retry(op, |p| write_attempt(p, cmd, data));

        match &result {
            Ok(()) => trace!("OK:    {op}"),
            Err(e) => debug!("Error: {op} {data:#010X}: {e:?}"),
        }
        result
    }

    fn do_read_op(&mut self, op: SwdOp) -> Result<u32, SwdError> {
        let cmd = op.to_cmd();
        trace!("Exec:  {op} SWD: {cmd:#04X}");

        let result = self.with_wait_retry(op, |p| read_attempt(p, cmd));

        match &result {
            Ok(data) => trace!("OK:    {op} {data:#010X}"),
            Err(e) => debug!("Error: {op} {e:?}"),
        }
        result
    }
}

// A single write transaction.  The data phase only happens after an OK ACK.
fn write_attempt<G: Gpio, D: Delay>(
    p: &mut SwdProtocol<G, D>,
    cmd: u8,
    data: u32,
) -> Result<(), SwdError> {
    p.idle(POST_SEQUENCE_IDLE);
    p.write(cmd as u32, 8);
    p.idle(2);
    p.turn(Direction::Input);
    let ack = p.read(3) as u8;
    p.turn(Direction::Output);
    p.idle(2);

    SwdError::from_ack(ack)?;

    p.write(data, 32);
    p.idle(1);
    p.write(calculate_parity(data) as u32, 1);
    p.idle(2);
    Ok(())
}

// A single read transaction.  The line is always turned back to us, whatever
// the ACK.
fn read_attempt<G: Gpio, D: Delay>(p: &mut SwdProtocol<G, D>, cmd: u8) -> Result<u32, SwdError> {
    p.idle(POST_SEQUENCE_IDLE);
    p.write(cmd as u32, 8);
    p.idle(2);
    p.turn(Direction::Input);
    p.idle(2);
    let ack = p.read(3) as u8;
    p.idle(1);

    let result = SwdError::from_ack(ack).and_then(|()| {
        let data = p.read(32);
        p.idle(1);
        let parity = p.read(1) == 1;
        p.idle(1);

        if calculate_parity(data) != parity {
            debug!("SWD read parity error: data={data:#010X}, parity={parity}");
            return Err(SwdError::ReadParity);
        }
        Ok(data)
    });

    p.turn(Direction::Output);
    p.idle(2);
    result
}

/// A single SWD register operation.
///
/// ```ignore
/// let ctrl_stat = SwdOp::Read(Reg::DP4);
/// let tar = SwdOp::Write(TarRegister::REG);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwdOp {
    Read(Reg),
    Write(Reg),
}

impl SwdOp {
    pub fn reg(&self) -> Reg {
        match self {
            SwdOp::Read(reg) | SwdOp::Write(reg) => *reg,
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, SwdOp::Read(_))
    }

    /// The request frame sent for this operation.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_cmd(&self) -> u8 {
        request(self.reg(), self.is_read())
    }
}

impl fmt::Display for SwdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.reg();
        let port = if reg.is_ap() { "AP" } else { "DP" };
        let dir = if self.is_read() { "Read" } else { "Write" };
        write!(f, "{port} {dir} 0x{:02X}", reg.offset())
    }
}
