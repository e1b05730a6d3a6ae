pub mod counter;
pub mod decode;
pub mod dis;
pub mod disasm;
pub mod dump;
pub mod halt;
pub mod jump;
pub mod load;
pub mod regs;
pub mod reset;
pub mod run;
pub mod status;
pub mod step;
pub mod trace;
