// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! SWD Debug Interface
//!
//! This module implements a high-level interface for reading and writing a
//! target's memory over SWD.  It configures the target's MEM-AP once, then
//! provides word-addressed peek and poke, singly or in bulk.
//!
//! If this module does not give you the control you need, you can use the
//! [`SwdInterface`] object directly for lower-level SWD access, via
//! [`DebugInterface::swd_if()`].

use core::result::Result;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use peerdap_core::SENTINEL;
use peerdap_core::arm::ap::{Idr, IdrRegister};
use peerdap_core::arm::dp::{
    Abort, AbortRegister, CtrlStat, CtrlStatRegister, IdCode, RdBuffRegister, Select,
    TargetSel,
};
use peerdap_core::arm::map::{Csw, CswRegister, Drw, DrwRegister, Tar, TarRegister};
use peerdap_core::arm::register::{ApRegister, DpRegister};

use crate::SwdError;
use crate::interface::{SwdConfig, SwdInterface};
use crate::pins::{Delay, Gpio};

// TAR auto-increment is only guaranteed within a 1KB block, so bulk
// transfers re-program TAR at each boundary.
const SWD_MEMORY_BOUNDARY: u32 = 0x400;

/// ARM Debug Interface object
///
/// This is used by applications to read and write the target's memory.
///
/// ```ignore
/// use peerdap_swd::DebugInterface;
///
/// let mut debug = DebugInterface::init(gpio, SpinDelay, SWDIO, SWCLK, SwdConfig::default());
///
/// debug.connect(None)?;
/// debug.setup_mem()?;
///
/// let value = debug.peek(0x2000_0000)?;
/// log::info!("Value at 0x2000_0000: 0x{value:08X}");
/// ```
///
/// All memory operations assume the MEM-AP was configured by
/// [`Self::setup_mem()`], and that DP SELECT still selects AP bank 0.
pub struct DebugInterface<G: Gpio, D: Delay> {
    swd: SwdInterface<G, D>,
    idcode: Option<IdCode>,
    idr: Option<Idr>,
}

impl<G: Gpio, D: Delay> DebugInterface<G, D> {
    /// Creates a new `DebugInterface` wrapping the given [`SwdInterface`].
    pub fn new(swd: SwdInterface<G, D>) -> Self {
        Self {
            swd,
            idcode: None,
            idr: None,
        }
    }

    /// Claims the pins and creates a `DebugInterface` in one step.  See
    /// [`SwdInterface::init()`].
    pub fn init(gpio: G, delay: D, swdio: G::Pin, swclk: G::Pin, config: SwdConfig) -> Self {
        Self::new(SwdInterface::init(gpio, delay, swdio, swclk, config))
    }

    /// Access to the underlying [`SwdInterface`].
    pub fn swd_if(&mut self) -> &mut SwdInterface<G, D> {
        &mut self.swd
    }

    /// Releases the pins and returns the capabilities.
    pub fn disconnect(self) -> (G, D) {
        self.swd.disconnect()
    }

    /// IDCODE read by the last successful [`Self::connect()`].
    pub fn idcode(&self) -> Option<IdCode> {
        self.idcode
    }

    /// MEM-AP IDR read by the last successful [`Self::setup_mem()`].
    pub fn idr(&self) -> Option<Idr> {
        self.idr
    }

    /// Brings up the link: reset, TARGETSEL if `target` is given, then the
    /// mandatory IDCODE read.
    ///
    /// Forgets any previously read IDCODE and IDR, so [`Self::setup_mem()`]
    /// must be run again afterwards.
    ///
    /// ```ignore
    /// use peerdap_core::arm::dp::TARGET_SEL_RP2040_CORE0;
    /// let idcode = debug.connect(Some(TARGET_SEL_RP2040_CORE0))?;
    /// ```
    pub fn connect(&mut self, target: Option<TargetSel>) -> Result<IdCode, SwdError> {
        trace!("Exec:  Connect");
        self.idcode = None;
        self.idr = None;

        self.swd.reset();
        if let Some(target) = target {
            self.swd.select_target(target);
        }
        let idcode = self.swd.read_idcode()?;

        if !idcode.is_arm_debug_port() {
            debug!("Value: IDCODE {idcode} not from an ARM designed DP");
        }
        self.idcode = Some(idcode);
        Ok(idcode)
    }

    /// Configures the target's MEM-AP for memory access.
    ///
    /// Clears sticky errors, powers up the debug and system domains, reads
    /// the AP's IDR, and programs CSW for 32-bit transfers with single
    /// auto-increment.  Leaves DP SELECT on bank 0.
    ///
    /// Must follow [`Self::connect()`] (or the equivalent calls on
    /// [`SwdInterface`]), and be repeated after every reconnect.
    ///
    /// Returns the IDR.  A failure at any step stops setup and returns that
    /// error.
    pub fn setup_mem(&mut self) -> Result<Idr, SwdError> {
        trace!("Exec:  Setup MEM-AP");
        self.idr = None;

        let swd = &mut self.swd;

        trace!("Exec:  Clear ABORT");
        swd.write_dp_register(AbortRegister, Abort::clear_all())?;
        swd.update_dp_select(Select::BANK_0)?;

        trace!("Exec:  Power up debug domain");
        swd.write_dp_register(CtrlStatRegister, CtrlStat::power_up())?;
        let status = swd.read_dp_register(CtrlStatRegister)?;
        trace!("Value: CTRL/STAT {status} {}", status.power_states());

        swd.update_dp_select(Select::BANK_IDR)?;
        let idr = swd.read_ap_register(IdrRegister)?;

        trace!("Exec:  Configure MEM-AP");
        swd.update_dp_select(Select::BANK_CSW)?;
        let csw = Csw::auto_increment_32bit();
        trace!("Value: CSW {csw} {}", csw.transfer_config());
        swd.write_ap_register(CswRegister, csw)?;
        swd.update_dp_select(Select::BANK_0)?;

        if idr.is_known_ahb_ap() {
            debug!("Value: MEM-AP IDR {idr}");
        } else {
            warn!("Unknown MEM-AP IDR {idr}: {}", idr.idr_info());
        }

        self.idr = Some(idr);
        trace!("OK:    Setup MEM-AP");
        Ok(idr)
    }

    /// Reads one word from the target's memory.
    ///
    /// Arguments:
    /// - `addr`: Word aligned address.
    pub fn peek(&mut self, addr: u32) -> Result<u32, SwdError> {
        check_aligned(addr)?;

        self.swd.write_ap_register(TarRegister, Tar::from(addr))?;
        let data = self.swd.read_ap_register(DrwRegister)?;

        trace!("Value: Peek 0x{addr:08X} {data}");
        Ok(data.data())
    }

    /// Writes one word to the target's memory.
    ///
    /// Arguments:
    /// - `addr`: Word aligned address.
    /// - `value`: Value to write.
    pub fn poke(&mut self, addr: u32, value: u32) -> Result<(), SwdError> {
        check_aligned(addr)?;

        self.swd.write_ap_register(TarRegister, Tar::from(addr))?;
        self.swd.write_ap_register(DrwRegister, Drw::from(value))?;

        trace!("OK:    Poke 0x{addr:08X} 0x{value:08X}");
        Ok(())
    }

    /// Reads `buf.len()` consecutive words starting at `addr`.
    ///
    /// Makes exactly one memory read per word.  Stops at the first error, in
    /// which case every word of `buf` not read is set to
    /// [`SENTINEL`].
    ///
    /// Returns:
    /// - `Ok(())`: `buf` contains the data read.
    /// - `Err((SwdError, usize))`: the error, and the number of words at the
    ///   start of `buf` that were read successfully.
    pub fn peek_many(&mut self, addr: u32, buf: &mut [u32]) -> Result<(), (SwdError, usize)> {
        trace!("Exec:  Peek many 0x{addr:08X} {}", buf.len());
        let result = self.read_mem_bulk(addr, buf);

        if let Err((e, count)) = &result {
            debug!("Error: Peek many 0x{addr:08X} after {count} words: {e}");
            buf[*count..].fill(SENTINEL);
        }
        result
    }

    /// Writes `values` to consecutive words starting at `addr`.
    ///
    /// Stops at the first error.  Writes already made are not undone.
    ///
    /// Returns:
    /// - `Ok(())`: all values were written.
    /// - `Err((SwdError, usize))`: the error, and the number of values
    ///   written successfully.
    pub fn poke_many(&mut self, addr: u32, values: &[u32]) -> Result<(), (SwdError, usize)> {
        trace!("Exec:  Poke many 0x{addr:08X} {}", values.len());
        check_aligned(addr).map_err(|e| (e, 0))?;

        let mut remaining = values;
        let mut current_addr = addr;
        let mut total_written = 0;

        while !remaining.is_empty() {
            let chunk_size = remaining.len().min(words_to_boundary(current_addr));

            self.swd
                .write_ap_register(TarRegister, Tar::from(current_addr))
                .map_err(|e| (e, total_written))?;

            let (chunk, rest) = remaining.split_at(chunk_size);
            for &value in chunk {
                self.swd
                    .write_ap_register(DrwRegister, Drw::from(value))
                    .map_err(|e| (e, total_written))?;
                total_written += 1;
            }

            remaining = rest;
            current_addr = current_addr.wrapping_add((chunk_size * 4) as u32);
        }

        Ok(())
    }
}

// Internal functions
impl<G: Gpio, D: Delay> DebugInterface<G, D> {
    fn read_mem_bulk(&mut self, addr: u32, buf: &mut [u32]) -> Result<(), (SwdError, usize)> {
        check_aligned(addr).map_err(|e| (e, 0))?;

        let mut remaining = buf;
        let mut current_addr = addr;
        let mut total_read = 0;

        while !remaining.is_empty() {
            let chunk_size = remaining.len().min(words_to_boundary(current_addr));

            self.swd
                .write_ap_register(TarRegister, Tar::from(current_addr))
                .map_err(|e| (e, total_read))?;

            let (chunk, rest) = remaining.split_at_mut(chunk_size);
            self.read_drw_bulk(chunk)
                .map_err(|(e, partial)| (e, total_read + partial))?;

            remaining = rest;
            current_addr = current_addr.wrapping_add((chunk_size * 4) as u32);
            total_read += chunk_size;
        }

        Ok(())
    }

    // Reads DRW `buf.len()` times.  AP reads are pipelined, so the first read
    // only primes the pipeline, each following read returns the word before
    // it, and the final word is collected from RDBUFF.  This makes exactly
    // one memory access per word.
    fn read_drw_bulk(&mut self, buf: &mut [u32]) -> Result<(), (SwdError, usize)> {
        let Some((last, rest)) = buf.split_last_mut() else {
            return Ok(());
        };

        let _ = self
            .swd
            .get_reg(<DrwRegister as ApRegister>::REG)
            .map_err(|e| (e, 0))?;

        let mut read_count = 0;
        for item in rest.iter_mut() {
            *item = self
                .swd
                .get_reg(<DrwRegister as ApRegister>::REG)
                .map_err(|e| (e, read_count))?;
            read_count += 1;
        }

        *last = self
            .swd
            .get_reg(<RdBuffRegister as DpRegister>::REG)
            .map_err(|e| (e, read_count))?;
        Ok(())
    }
}

fn check_aligned(addr: u32) -> Result<(), SwdError> {
    if addr & 0x3 != 0 {
        debug!("Error: Attempt to access 0x{addr:08X}, not on a 4 byte boundary");
        return Err(SwdError::Api);
    }
    Ok(())
}

// Words from `addr` up to the next auto-increment boundary.
fn words_to_boundary(addr: u32) -> usize {
    let boundary_offset = SWD_MEMORY_BOUNDARY - (addr & (SWD_MEMORY_BOUNDARY - 1));
    (boundary_offset / 4) as usize
}
