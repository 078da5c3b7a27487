//! DVI interpretation: opcodes, state, the interpreter and its devices.

pub mod device;
pub mod interpreter;
pub mod opcode;
pub mod state;
pub mod trailer;

pub use device::{DviDevice, EventCounter, PageCollector};
pub use interpreter::{InterpState, Interpreter};
pub use opcode::{Opcode, Register};
pub use state::{
    DviDocument, Event, FontDefinition, GraphicsState, PageState, Placement, Postamble, Preamble,
    Registers,
};
pub use trailer::{PageIndex, Trailer};
