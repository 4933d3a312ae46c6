//! Simulated ADS1220 used by the unit tests
//!
//! Models the configuration registers, command decoding, conversions and the DRDY line. A
//! conversion latches the register 0 value at its start and produces the value of
//! [`SimAdc::inputs`] for that multiplexer setting once it completes.
use core::convert::Infallible;

use crate::{cmd, Ads1220, Capabilities, Interface, NUM_REGISTERS};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Event {
    Reset,
    StartSync,
    PowerDown,
    ReadRegister(u8),
    ReadRegisters,
    WriteRegisters { start: u8, values: Vec<u8> },
    ReadData,
}

#[derive(Default)]
struct Frame {
    cmd: Option<u8>,
    params: Vec<u8>,
    data_idx: usize,
    reg_ptr: usize,
}

pub struct SimAdc {
    pub regs: [u8; NUM_REGISTERS],
    /// Conversion result per multiplexer setting
    pub inputs: [i32; 16],
    pub events: Vec<Event>,
    pub elapsed_us: u64,
    /// DRDY never asserts
    pub stuck: bool,
    /// Polls of DRDY until a started conversion completes
    pub settle_polls: u32,
    pub caps: Capabilities,
    /// `send_receive` returns [None] although the capability is reported
    pub refuse_send_receive: bool,
    /// Conversions started on an AVSS channel without a valid bypass setting
    pub pga_violations: u32,
    /// Data reads started before DRDY was asserted
    pub stale_reads: u32,
    /// Data reads which also wrote register 0
    pub pipelined_reads: u32,
    pub frames: u32,
    pub selected: bool,
    frame: Frame,
    /// Continuous conversions started by START/SYNC and not stopped since
    running: bool,
    countdown: Option<u32>,
    ready: bool,
    converting_config0: u8,
    latched: [u8; 3],
}

impl SimAdc {
    pub fn new() -> Self {
        SimAdc {
            regs: [0; NUM_REGISTERS],
            inputs: [0; 16],
            events: Vec::new(),
            elapsed_us: 0,
            stuck: false,
            settle_polls: 3,
            caps: Capabilities {
                send_receive: true,
                data_ready: true,
            },
            refuse_send_receive: false,
            pga_violations: 0,
            stale_reads: 0,
            pipelined_reads: 0,
            frames: 0,
            selected: false,
            frame: Frame::default(),
            running: false,
            countdown: None,
            ready: false,
            converting_config0: 0,
            latched: [0; 3],
        }
    }

    pub fn without_data_ready(mut self) -> Self {
        self.caps.data_ready = false;
        self
    }

    pub fn without_send_receive(mut self) -> Self {
        self.caps.send_receive = false;
        self
    }

    /// Values written to register 0, in order
    pub fn config0_writes(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::WriteRegisters { start: 0, values } => Some(values[0]),
                _ => None,
            })
            .collect()
    }

    fn continuous(&self) -> bool {
        self.regs[1] & (1 << 2) != 0
    }

    fn start_conversion(&mut self) {
        let config0 = self.regs[0];
        let mux = config0 >> 4;
        let gain = (config0 >> 1) & 0b111;
        if (0b1000..=0b1011).contains(&mux) && (config0 & 1 == 0 || gain > 0b010) {
            self.pga_violations += 1;
        }
        self.converting_config0 = config0;
        self.countdown = Some(self.settle_polls);
        self.ready = false;
    }

    fn complete_conversion(&mut self) {
        let value = self.inputs[(self.converting_config0 >> 4) as usize] as u32 & 0xFF_FFFF;
        self.latched = [(value >> 16) as u8, (value >> 8) as u8, value as u8];
        self.countdown = None;
        self.ready = true;
    }

    fn command(&mut self, byte: u8) {
        match byte {
            cmd::RESET => {
                self.events.push(Event::Reset);
                self.regs = [0; NUM_REGISTERS];
                self.running = false;
                self.countdown = None;
                self.ready = false;
            }
            cmd::START_SYNC => {
                self.events.push(Event::StartSync);
                self.running = self.continuous();
                self.start_conversion();
            }
            cmd::POWERDOWN => {
                self.events.push(Event::PowerDown);
                self.running = false;
                self.countdown = None;
            }
            b if b & 0xF0 == cmd::RREG => {
                let start = (b >> 2) & 0b11;
                if b & 0b11 == 0 {
                    self.events.push(Event::ReadRegister(start));
                } else {
                    self.events.push(Event::ReadRegisters);
                }
                self.frame.reg_ptr = start as usize;
            }
            _ => (),
        }
    }

    fn byte_in(&mut self, byte: u8) {
        let cmd = match self.frame.cmd {
            None => {
                self.frame.cmd = Some(byte);
                self.command(byte);
                return;
            }
            Some(cmd) => cmd,
        };
        if cmd & 0xF0 != cmd::WREG {
            return;
        }
        let start = ((cmd >> 2) & 0b11) as usize;
        let count = (cmd & 0b11) as usize + 1;
        if self.frame.params.len() == count {
            return;
        }
        self.regs[(start + self.frame.params.len()) % NUM_REGISTERS] = byte;
        self.frame.params.push(byte);
        if self.frame.params.len() == count {
            self.events.push(Event::WriteRegisters {
                start: start as u8,
                values: self.frame.params.clone(),
            });
            if !self.continuous() {
                self.running = false;
            } else if self.running {
                self.start_conversion();
            }
        }
    }

    fn data_out(&mut self) -> u8 {
        if self.frame.data_idx == 0 && !self.ready {
            self.stale_reads += 1;
        }
        let byte = self.latched.get(self.frame.data_idx).copied().unwrap_or(0);
        self.frame.data_idx += 1;
        byte
    }

    fn end_frame(&mut self) {
        if self.frame.data_idx >= 3 {
            self.events.push(Event::ReadData);
            if self.frame.cmd.is_some() {
                self.pipelined_reads += 1;
            } else if self.running {
                self.start_conversion();
            }
            if self.countdown.is_none() {
                self.ready = false;
            }
        }
        self.frame = Frame::default();
    }
}

impl Interface for SimAdc {
    type Error = Infallible;

    fn select(&mut self, active: bool) -> Result<(), Self::Error> {
        if active {
            self.frame = Frame::default();
        } else {
            self.frames += 1;
            self.end_frame();
        }
        self.selected = active;
        Ok(())
    }

    fn send(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.byte_in(byte);
        Ok(())
    }

    fn receive(&mut self) -> Result<u8, Self::Error> {
        Ok(match self.frame.cmd {
            None => self.data_out(),
            Some(cmd) if cmd & 0xF0 == cmd::RREG => {
                let value = self.regs[self.frame.reg_ptr % NUM_REGISTERS];
                self.frame.reg_ptr += 1;
                value
            }
            Some(_) => 0xFF,
        })
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += us as u64;
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn send_receive(&mut self, byte: u8) -> Option<Result<u8, Self::Error>> {
        if !self.caps.send_receive || self.refuse_send_receive {
            return None;
        }
        let out = self.data_out();
        self.byte_in(byte);
        Some(Ok(out))
    }

    fn is_converting(&mut self) -> Option<Result<bool, Self::Error>> {
        if !self.caps.data_ready {
            return None;
        }
        if self.stuck {
            return Some(Ok(true));
        }
        let converting = match self.countdown {
            Some(0) => {
                self.complete_conversion();
                false
            }
            Some(n) => {
                self.countdown = Some(n - 1);
                true
            }
            None => !self.ready,
        };
        Some(Ok(converting))
    }
}

impl Ads1220<SimAdc> {
    pub(crate) fn iface_mut(&mut self) -> &mut SimAdc {
        &mut self.iface
    }

    pub(crate) fn clear_events(&mut self) {
        self.iface.events.clear();
        self.iface.pipelined_reads = 0;
    }
}
