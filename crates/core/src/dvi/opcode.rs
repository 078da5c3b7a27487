//! DVI opcodes.
//!
//! The numeric values are the wire format. [`Opcode::from_byte`] maps every
//! byte to exactly one variant; bytes 250 to 255 are reserved and decode to
//! [`Opcode::Undefined`].

pub const SET_CHAR_0: u8 = 0;
pub const SET_CHAR_127: u8 = 127;
pub const SET1: u8 = 128; /* set1..set4 take a 1-4 byte character code */
pub const SET_RULE: u8 = 132; /* height[4] width[4], both signed */
pub const PUT1: u8 = 133;
pub const PUT_RULE: u8 = 137;
pub const NOP: u8 = 138;
pub const BOP: u8 = 139; /* c0..c9[4] p[4] */
pub const EOP: u8 = 140;
pub const PUSH: u8 = 141;
pub const POP: u8 = 142;
pub const RIGHT1: u8 = 143;
pub const W0: u8 = 147;
pub const W1: u8 = 148;
pub const X0: u8 = 152;
pub const X1: u8 = 153;
pub const DOWN1: u8 = 157;
pub const Y0: u8 = 161;
pub const Y1: u8 = 162;
pub const Z0: u8 = 166;
pub const Z1: u8 = 167;
pub const FNT_NUM_0: u8 = 171;
pub const FNT_NUM_63: u8 = 234;
pub const FNT1: u8 = 235;
pub const XXX1: u8 = 239; /* length[1-4] followed by the special's bytes */
pub const FNT_DEF1: u8 = 243; /* k[1-4] c[4] s[4] d[4] a[1] l[1] n[a+l] */
pub const PRE: u8 = 247; /* i[1] num[4] den[4] mag[4] k[1] x[k] */
pub const POST: u8 = 248; /* p[4] num[4] den[4] mag[4] l[4] u[4] s[2] t[2] */
pub const POST_POST: u8 = 249; /* q[4] i[1] then four or more 223s */
pub const PADDING: u8 = 223;

/// Format id byte of standard DVI files.
pub const DVI_ID: u8 = 2;
/// Trailer id byte of Ascii pTeX files whose preamble says [`DVI_ID`].
pub const DVIV_ID: u8 = 3;

/// Which of the four movement registers an opcode addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    W,
    X,
    Y,
    Z,
}

/// A decoded opcode. Operand widths (1 to 4 bytes) are carried in the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Typeset character 0..=127 and advance
    SetChar(u8),
    /// Typeset a character with a 1-4 byte code and advance
    Set(u8),
    SetRule,
    /// Typeset a character with a 1-4 byte code without advancing
    Put(u8),
    PutRule,
    Nop,
    BeginPage,
    EndPage,
    Push,
    Pop,
    /// Move right by a 1-4 byte signed amount
    Right(u8),
    /// Move by a register; width 0 reuses the stored value
    Move(Register, u8),
    /// Move down by a 1-4 byte signed amount
    Down(u8),
    /// Select font 0..=63
    FontNum(u8),
    /// Select a font with a 1-4 byte number
    Font(u8),
    /// Special with a 1-4 byte length
    Special(u8),
    /// Font definition with a 1-4 byte font number
    FontDef(u8),
    Preamble,
    Postamble,
    PostPostamble,
    /// Reserved opcodes 250..=255
    Undefined(u8),
}

impl Opcode {
    pub fn from_byte(b: u8) -> Self {
        match b {
            SET_CHAR_0..=SET_CHAR_127 => Opcode::SetChar(b),
            128..=131 => Opcode::Set(b - SET1 + 1),
            SET_RULE => Opcode::SetRule,
            133..=136 => Opcode::Put(b - PUT1 + 1),
            PUT_RULE => Opcode::PutRule,
            NOP => Opcode::Nop,
            BOP => Opcode::BeginPage,
            EOP => Opcode::EndPage,
            PUSH => Opcode::Push,
            POP => Opcode::Pop,
            143..=146 => Opcode::Right(b - RIGHT1 + 1),
            147..=151 => Opcode::Move(Register::W, b - W0),
            152..=156 => Opcode::Move(Register::X, b - X0),
            157..=160 => Opcode::Down(b - DOWN1 + 1),
            161..=165 => Opcode::Move(Register::Y, b - Y0),
            166..=170 => Opcode::Move(Register::Z, b - Z0),
            FNT_NUM_0..=FNT_NUM_63 => Opcode::FontNum(b - FNT_NUM_0),
            235..=238 => Opcode::Font(b - FNT1 + 1),
            239..=242 => Opcode::Special(b - XXX1 + 1),
            243..=246 => Opcode::FontDef(b - FNT_DEF1 + 1),
            PRE => Opcode::Preamble,
            POST => Opcode::Postamble,
            POST_POST => Opcode::PostPostamble,
            250..=255 => Opcode::Undefined(b),
        }
    }

    /// Mnemonic as used in DVI listings (`set_char_65`, `w3`, `fnt_def1`...).
    pub fn mnemonic(self) -> String {
        match self {
            Opcode::SetChar(c) => format!("set_char_{c}"),
            Opcode::Set(n) => format!("set{n}"),
            Opcode::SetRule => "set_rule".to_string(),
            Opcode::Put(n) => format!("put{n}"),
            Opcode::PutRule => "put_rule".to_string(),
            Opcode::Nop => "nop".to_string(),
            Opcode::BeginPage => "bop".to_string(),
            Opcode::EndPage => "eop".to_string(),
            Opcode::Push => "push".to_string(),
            Opcode::Pop => "pop".to_string(),
            Opcode::Right(n) => format!("right{n}"),
            Opcode::Move(reg, n) => {
                let r = match reg {
                    Register::W => 'w',
                    Register::X => 'x',
                    Register::Y => 'y',
                    Register::Z => 'z',
                };
                format!("{r}{n}")
            }
            Opcode::Down(n) => format!("down{n}"),
            Opcode::FontNum(f) => format!("fnt_num_{f}"),
            Opcode::Font(n) => format!("fnt{n}"),
            Opcode::Special(n) => format!("xxx{n}"),
            Opcode::FontDef(n) => format!("fnt_def{n}"),
            Opcode::Preamble => "pre".to_string(),
            Opcode::Postamble => "post".to_string(),
            Opcode::PostPostamble => "post_post".to_string(),
            Opcode::Undefined(b) => format!("undefined_{b}"),
        }
    }
}
