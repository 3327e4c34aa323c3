// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! In-memory SWD bus for integration tests.
//!
//! [`MockGpio`] implements the GPIO capability.  Every SWCLK rising edge is
//! recorded along with what the host was driving on SWDIO, and passed to a
//! simulated [`Target`] which behaves like a DPv2 debug port with a single
//! AHB-AP in front of a sparse memory.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use peerdap_swd::SwdInterface;
use peerdap_swd::interface::SwdConfig;
use peerdap_swd::pins::{Direction, Gpio, Level, NoDelay};

pub const RP2040_IDCODE: u32 = 0x0BC1_2477;
pub const RP2040_CORE0: u32 = 0x0100_2927;
pub const RP2040_CORE1: u32 = 0x1100_2927;
pub const AHB_AP_IDR: u32 = 0x0477_0031;

pub const ACK_OK: u8 = 0b001;
pub const ACK_WAIT: u8 = 0b010;
pub const ACK_FAULT: u8 = 0b100;

const SELECTION_ALERT: u128 = 0x19BC_0EA2_E3DD_AFE9_8685_2D95_6209_F392;
const ACTIVATION: u16 = 0x1A0;
const ACTIVATION_BITS: u8 = 12;

pub fn init_logging() {
    let _ = pretty_env_logger::formatted_builder()
        .is_test(true)
        .try_init();
}

/// `count` bits of `word`, LSB first, as the host would drive them.
pub fn bits(word: u32, count: u32) -> Vec<Option<bool>> {
    (0..count).map(|ii| Some((word >> ii) & 1 == 1)).collect()
}

fn odd_parity(value: u32) -> bool {
    value.count_ones() % 2 == 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Swdio,
    Swclk,
}

/// One SWCLK rising edge.  `host` is the level the host drove on SWDIO, or
/// `None` if SWDIO was an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub host: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccess {
    Read(u32),
    Write(u32, u32),
}

/// A request frame the target accepted, and how it answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Txn {
    pub frame: u8,
    /// `None` when no ACK was driven, as for TARGETSEL by default
    pub ack: Option<u8>,
    /// Data sent by the target for reads, or received for writes
    pub value: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dormant,
    Activating { bits: u16, count: u8 },
    AwaitingReset,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteDest {
    TargetSel,
    Reg { ap: bool, addr: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Request { frame: u8, count: u8 },
    WriteData { dest: WriteDest, value: u64, count: u8 },
}

/// Simulated SWD target.
#[derive(Debug)]
pub struct Target {
    pub idcode: u32,
    pub idr: u32,
    /// Multidrop TARGETSEL value, or `None` for a single-drop target
    pub targetsel: Option<u32>,

    // Fault injection
    pub wait_count: u32,
    pub always_wait: bool,
    pub fault_on_txn: Option<usize>,
    pub corrupt_parity_next: bool,
    /// ACK driven during TARGETSEL, which the host must ignore
    pub targetsel_ack: Option<u8>,

    pub mode: Mode,
    pub lockout: bool,
    pub awaiting_targetsel: bool,
    pub deselected: bool,
    ones: u32,
    history: u128,
    phase: Phase,
    queue: VecDeque<Option<bool>>,
    pending: Option<WriteDest>,

    pub abort_writes: Vec<u32>,
    pub ctrl_stat: u32,
    pub select: u32,
    pub sticky: u32,
    ap_buffer: u32,
    pub csw: u32,
    pub tar: u32,
    pub memory: BTreeMap<u32, u32>,

    pub txns: Vec<Txn>,
    pub mem_log: Vec<MemAccess>,
    pub targetsel_writes: Vec<u32>,
    pub line_resets: u32,
    pub contention: bool,
    pub write_parity_errors: u32,
}

impl Target {
    /// A dormant single-drop target.
    pub fn new() -> Self {
        Self {
            idcode: RP2040_IDCODE,
            idr: AHB_AP_IDR,
            targetsel: None,
            wait_count: 0,
            always_wait: false,
            fault_on_txn: None,
            corrupt_parity_next: false,
            targetsel_ack: None,
            mode: Mode::Dormant,
            lockout: false,
            awaiting_targetsel: false,
            deselected: false,
            ones: 0,
            history: 0,
            phase: Phase::Idle,
            queue: VecDeque::new(),
            pending: None,
            abort_writes: Vec::new(),
            ctrl_stat: 0,
            select: 0,
            sticky: 0,
            ap_buffer: 0,
            csw: 0,
            tar: 0,
            memory: BTreeMap::new(),
            txns: Vec::new(),
            mem_log: Vec::new(),
            targetsel_writes: Vec::new(),
            line_resets: 0,
            contention: false,
            write_parity_errors: 0,
        }
    }

    /// A dormant multidrop target answering to `targetsel`.
    pub fn multidrop(targetsel: u32) -> Self {
        Self {
            targetsel: Some(targetsel),
            ..Self::new()
        }
    }

    /// Level the target is driving on SWDIO, if any.
    pub fn drive(&self) -> Option<bool> {
        self.queue.front().copied().flatten()
    }

    pub fn clear_logs(&mut self) {
        self.txns.clear();
        self.mem_log.clear();
    }

    fn on_rising_edge(&mut self, host: Option<bool>) {
        if let Some(bit) = host {
            if self.track_link(bit) {
                return;
            }
        }

        if self.queue.pop_front().is_some() {
            // Target owned slot.  The host must not be driving.
            if host.is_some() {
                self.contention = true;
            }
            if self.queue.is_empty() {
                if let Some(dest) = self.pending.take() {
                    self.phase = Phase::WriteData {
                        dest,
                        value: 0,
                        count: 0,
                    };
                }
            }
            return;
        }

        let Some(bit) = host else {
            return;
        };

        match self.phase {
            Phase::Idle => {
                if bit && self.mode == Mode::Active && !self.deselected {
                    self.phase = Phase::Request { frame: 1, count: 1 };
                }
            }
            Phase::Request { frame, count } => {
                let frame = frame | ((bit as u8) << count);
                let count = count + 1;
                if count == 8 {
                    self.phase = Phase::Idle;
                    self.on_request(frame);
                } else {
                    self.phase = Phase::Request { frame, count };
                }
            }
            Phase::WriteData { dest, value, count } => {
                let value = value | ((bit as u64) << count);
                let count = count + 1;
                if count == 33 {
                    self.phase = Phase::Idle;
                    self.on_write(dest, value);
                } else {
                    self.phase = Phase::WriteData { dest, value, count };
                }
            }
        }
    }

    // Line reset and dormant wake detection.  Returns true if this bit
    // completed a line reset.
    fn track_link(&mut self, bit: bool) -> bool {
        if bit {
            self.ones = self.ones.saturating_add(1);
        } else {
            let ones = self.ones;
            self.ones = 0;
            if ones >= 50 && matches!(self.mode, Mode::Active | Mode::AwaitingReset) {
                self.line_reset();
                return true;
            }
        }

        self.history = (self.history >> 1) | ((bit as u128) << 127);

        match self.mode {
            Mode::Dormant => {
                if self.history == SELECTION_ALERT {
                    self.mode = Mode::Activating { bits: 0, count: 0 };
                }
            }
            Mode::Activating { bits, count } => {
                let bits = bits | ((bit as u16) << count);
                let count = count + 1;
                self.mode = if count < ACTIVATION_BITS {
                    Mode::Activating { bits, count }
                } else if bits == ACTIVATION {
                    Mode::AwaitingReset
                } else {
                    Mode::Dormant
                };
            }
            Mode::AwaitingReset | Mode::Active => {}
        }
        false
    }

    fn line_reset(&mut self) {
        self.mode = Mode::Active;
        self.lockout = true;
        self.awaiting_targetsel = self.targetsel.is_some();
        self.deselected = false;
        self.phase = Phase::Idle;
        self.queue.clear();
        self.pending = None;
        self.line_resets += 1;
    }

    fn on_request(&mut self, frame: u8) {
        let valid = frame & 0x01 != 0
            && frame & 0x40 == 0
            && frame & 0x80 != 0
            && ((frame >> 1) & 0x1F).count_ones() % 2 == 0;
        if !valid {
            return;
        }

        let ap = frame & 0x02 != 0;
        let read = frame & 0x04 != 0;
        let addr = (frame >> 1) & 0x0C;

        if !ap && !read && addr == 0x0C {
            self.queue.push_back(None);
            match self.targetsel_ack {
                Some(ack) => self
                    .queue
                    .extend((0..3).map(|ii| Some(ack & (1 << ii) != 0))),
                None => self.queue.extend([None; 3]),
            }
            self.queue.push_back(None);
            self.pending = Some(WriteDest::TargetSel);
            self.txns.push(Txn {
                frame,
                ack: self.targetsel_ack,
                value: None,
            });
            return;
        }

        // A multidrop target stays silent until selected.  Until IDCODE is
        // read after a line reset, nothing else is answered.
        if self.awaiting_targetsel {
            return;
        }
        if self.lockout && !(!ap && read && addr == 0x00) {
            return;
        }

        let ack = if self.always_wait || self.wait_count > 0 {
            self.wait_count = self.wait_count.saturating_sub(1);
            ACK_WAIT
        } else if self.fault_on_txn == Some(self.txns.len()) {
            self.sticky |= 1 << 5;
            ACK_FAULT
        } else {
            ACK_OK
        };

        self.queue.push_back(None);
        for ii in 0..3 {
            self.queue.push_back(Some((ack >> ii) & 1 == 1));
        }

        let mut value = None;
        if ack == ACK_OK {
            if read {
                let data = self.read_reg(ap, addr);
                for ii in 0..32 {
                    self.queue.push_back(Some((data >> ii) & 1 == 1));
                }
                let parity = odd_parity(data) ^ self.corrupt_parity_next;
                self.corrupt_parity_next = false;
                self.queue.push_back(Some(parity));
                value = Some(data);
            } else {
                self.pending = Some(WriteDest::Reg { ap, addr });
            }
        }
        self.queue.push_back(None);

        self.txns.push(Txn {
            frame,
            ack: Some(ack),
            value,
        });
    }

    fn on_write(&mut self, dest: WriteDest, raw: u64) {
        let data = raw as u32;
        let parity = (raw >> 32) & 1 == 1;
        if let Some(txn) = self.txns.last_mut() {
            txn.value = Some(data);
        }
        if parity != odd_parity(data) {
            self.write_parity_errors += 1;
            return;
        }

        match dest {
            WriteDest::TargetSel => {
                self.targetsel_writes.push(data);
                if let Some(id) = self.targetsel {
                    self.awaiting_targetsel = false;
                    self.deselected = id != data;
                }
            }
            WriteDest::Reg { ap, addr } => self.write_reg(ap, addr, data),
        }
    }

    fn ap_addr(&self, addr: u8) -> u8 {
        // ADIv5 APBANKSEL
        ((((self.select >> 4) & 0xF) as u8) << 4) | addr
    }

    fn next_tar(&mut self) {
        if (self.csw >> 4) & 0b11 == 0b01 {
            // Auto-increment wraps within a 1KB block
            self.tar = (self.tar & !0x3FF) | (self.tar.wrapping_add(4) & 0x3FF);
        }
    }

    fn read_reg(&mut self, ap: bool, addr: u8) -> u32 {
        if !ap {
            return match addr {
                0x0 => {
                    self.lockout = false;
                    self.idcode
                }
                0x4 => {
                    let mut value = self.ctrl_stat | self.sticky;
                    if value & (1 << 30) != 0 {
                        value |= 1 << 31;
                    }
                    if value & (1 << 28) != 0 {
                        value |= 1 << 29;
                    }
                    value
                }
                0xC => self.ap_buffer,
                _ => 0,
            };
        }

        let value = match self.ap_addr(addr) {
            0x00 => self.csw,
            0x04 => self.tar,
            0x0C => {
                let tar = self.tar;
                self.mem_log.push(MemAccess::Read(tar));
                self.next_tar();
                self.memory.get(&tar).copied().unwrap_or(0)
            }
            0xFC => self.idr,
            _ => 0,
        };

        // AP reads are posted.  This read returns the previous result.
        std::mem::replace(&mut self.ap_buffer, value)
    }

    fn write_reg(&mut self, ap: bool, addr: u8, data: u32) {
        if !ap {
            match addr {
                0x0 => {
                    self.abort_writes.push(data);
                    self.sticky = 0;
                }
                0x4 => self.ctrl_stat = data,
                0x8 => self.select = data,
                _ => {}
            }
            return;
        }

        match self.ap_addr(addr) {
            0x00 => self.csw = data,
            0x04 => self.tar = data,
            0x0C => {
                let tar = self.tar;
                self.mem_log.push(MemAccess::Write(tar, data));
                self.memory.insert(tar, data);
                self.next_tar();
            }
            _ => {}
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new()
    }
}

/// Bus state shared between the test and the [`MockGpio`] owned by the
/// session.
#[derive(Debug)]
pub struct Bus {
    pub swdio_dir: Direction,
    pub swclk_dir: Direction,
    pub swdio: Level,
    pub swclk: Level,
    pub pull_up: bool,
    pub initialized: Vec<Line>,
    pub edges: Vec<Edge>,
    pub target: Target,
}

impl Bus {
    /// Host SWDIO levels for every edge recorded so far.
    pub fn host_bits(&self) -> Vec<Option<bool>> {
        self.edges.iter().map(|e| e.host).collect()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.target.clear_logs();
    }
}

pub type SharedBus = Rc<RefCell<Bus>>;

#[derive(Debug, Clone)]
pub struct MockGpio {
    bus: SharedBus,
}

impl MockGpio {
    pub fn new(target: Target) -> (Self, SharedBus) {
        let bus = Rc::new(RefCell::new(Bus {
            swdio_dir: Direction::Input,
            swclk_dir: Direction::Input,
            swdio: Level::Low,
            swclk: Level::Low,
            pull_up: false,
            initialized: Vec::new(),
            edges: Vec::new(),
            target,
        }));
        (Self { bus: bus.clone() }, bus)
    }
}

impl Gpio for MockGpio {
    type Pin = Line;

    fn init(&mut self, pin: Line) {
        self.bus.borrow_mut().initialized.push(pin);
    }

    fn set_direction(&mut self, pin: Line, direction: Direction) {
        let mut bus = self.bus.borrow_mut();
        match pin {
            Line::Swdio => bus.swdio_dir = direction,
            Line::Swclk => bus.swclk_dir = direction,
        }
    }

    fn set_pull(&mut self, pin: Line, up: bool, _down: bool) {
        if pin == Line::Swdio {
            self.bus.borrow_mut().pull_up = up;
        }
    }

    fn write(&mut self, pin: Line, level: Level) {
        let mut bus = self.bus.borrow_mut();
        match pin {
            Line::Swdio => bus.swdio = level,
            Line::Swclk => {
                let rising = bus.swclk == Level::Low && level == Level::High;
                bus.swclk = level;
                if rising && bus.swclk_dir == Direction::Output {
                    let host = (bus.swdio_dir == Direction::Output)
                        .then_some(bus.swdio == Level::High);
                    bus.edges.push(Edge { host });
                    bus.target.on_rising_edge(host);
                }
            }
        }
    }

    fn read(&mut self, pin: Line) -> Level {
        let bus = self.bus.borrow();
        match pin {
            Line::Swdio => {
                if bus.swdio_dir == Direction::Output {
                    bus.swdio
                } else {
                    match bus.target.drive() {
                        Some(level) => Level::from(level),
                        None if bus.pull_up => Level::High,
                        None => Level::Low,
                    }
                }
            }
            Line::Swclk => bus.swclk,
        }
    }
}

pub type TestSwd = SwdInterface<MockGpio, NoDelay>;

/// A session on a fresh bus, nothing sent yet.
pub fn session(target: Target) -> (TestSwd, SharedBus) {
    init_logging();
    let (gpio, bus) = MockGpio::new(target);
    let swd = SwdInterface::init(
        gpio,
        NoDelay,
        Line::Swdio,
        Line::Swclk,
        SwdConfig::default(),
    );
    (swd, bus)
}

/// A session with the link up and the logs cleared.
pub fn connected(target: Target) -> (TestSwd, SharedBus) {
    let (mut swd, bus) = session(target);
    swd.reset();
    let targetsel = bus.borrow().target.targetsel;
    if let Some(id) = targetsel {
        swd.select_target(id);
    }
    swd.read_idcode().expect("IDCODE read failed");
    bus.borrow_mut().clear();
    (swd, bus)
}
