//! Effect and volume-column command decoding
//!
//! Pattern cells store the raw FT2 bytes. The replayer keeps those bytes in
//! channel state (several quirks compare raw values across rows) and decodes
//! them here right before dispatch.

/// Main effect column command
///
/// Discriminants follow the XM letter index: `0-9` then `A=10` up to `Z=35`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    /// No effect, or an opcode FT2 ignores
    #[default]
    None,
    /// 0xy: cycle base note, +x, +y semitones
    Arpeggio(u8),
    /// 1xx: slide pitch up
    PortaUp(u8),
    /// 2xx: slide pitch down
    PortaDown(u8),
    /// 3xx: slide toward the row's note
    TonePortamento(u8),
    /// 4xy: vibrato with speed x, depth y
    Vibrato(u8),
    /// 5xy: tone portamento + volume slide
    TonePortaVolSlide(u8),
    /// 6xy: vibrato + volume slide
    VibratoVolSlide(u8),
    /// 7xy: tremolo with speed x, depth y
    Tremolo(u8),
    /// 8xx: set panning
    SetPanning(u8),
    /// 9xx: start sample at offset xx * 256
    SampleOffset(u8),
    /// Axy: volume slide up x / down y
    VolumeSlide(u8),
    /// Bxx: jump to order xx
    PositionJump(u8),
    /// Cxx: set volume
    SetVolume(u8),
    /// Dxx: break to row xx (BCD) of the next pattern
    PatternBreak(u8),
    /// Exy: extended commands
    Extended(ExtendedEffect),
    /// Fxx: set speed (< 32) or BPM (>= 32)
    SetSpeed(u8),
    /// Gxx: set global volume
    SetGlobalVolume(u8),
    /// Hxy: global volume slide
    GlobalVolumeSlide(u8),
    /// Kxx: key off at tick xx
    KeyOff(u8),
    /// Lxx: set envelope position
    SetEnvelopePosition(u8),
    /// Pxy: panning slide
    PanningSlide(u8),
    /// Rxy: multi retrigger note
    MultiRetrig(u8),
    /// Txy: tremor
    Tremor(u8),
    /// X1x: extra fine portamento up
    ExtraFinePortaUp(u8),
    /// X2x: extra fine portamento down
    ExtraFinePortaDown(u8),
}

impl Effect {
    pub const ARPEGGIO: u8 = 0;
    pub const TONE_PORTAMENTO: u8 = 3;
    pub const VIBRATO: u8 = 4;
    pub const TONE_PORTA_VOL_SLIDE: u8 = 5;
    pub const VIBRATO_VOL_SLIDE: u8 = 6;
    pub const SAMPLE_OFFSET: u8 = 9;
    pub const EXTENDED: u8 = 14;
    pub const KEY_OFF: u8 = 20;
    pub const MULTI_RETRIG: u8 = 27;
    /// Highest opcode FT2 dispatches
    pub const LAST: u8 = 35;

    /// Decode a raw effect byte pair
    pub fn from_raw(efx: u8, data: u8) -> Self {
        match efx {
            0 => Self::Arpeggio(data),
            1 => Self::PortaUp(data),
            2 => Self::PortaDown(data),
            3 => Self::TonePortamento(data),
            4 => Self::Vibrato(data),
            5 => Self::TonePortaVolSlide(data),
            6 => Self::VibratoVolSlide(data),
            7 => Self::Tremolo(data),
            8 => Self::SetPanning(data),
            9 => Self::SampleOffset(data),
            10 => Self::VolumeSlide(data),
            11 => Self::PositionJump(data),
            12 => Self::SetVolume(data),
            13 => Self::PatternBreak(data),
            14 => Self::Extended(ExtendedEffect::from_raw(data)),
            15 => Self::SetSpeed(data),
            16 => Self::SetGlobalVolume(data),
            17 => Self::GlobalVolumeSlide(data),
            20 => Self::KeyOff(data),
            21 => Self::SetEnvelopePosition(data),
            25 => Self::PanningSlide(data),
            27 => Self::MultiRetrig(data),
            29 => Self::Tremor(data),
            33 => match data >> 4 {
                1 => Self::ExtraFinePortaUp(data & 0x0F),
                2 => Self::ExtraFinePortaDown(data & 0x0F),
                _ => Self::None,
            },
            _ => Self::None,
        }
    }
}

/// Exy sub-command, carrying the low nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedEffect {
    FinePortaUp(u8),
    FinePortaDown(u8),
    GlissandoControl(u8),
    VibratoControl(u8),
    SetFinetune(u8),
    PatternLoop(u8),
    TremoloControl(u8),
    Retrigger(u8),
    FineVolumeSlideUp(u8),
    FineVolumeSlideDown(u8),
    NoteCut(u8),
    NoteDelay(u8),
    PatternDelay(u8),
    /// E0x, E8x and EFx do nothing in FT2
    Unused(u8),
}

impl ExtendedEffect {
    pub const SET_FINETUNE: u8 = 0x5;
    pub const RETRIGGER: u8 = 0x9;
    pub const NOTE_DELAY: u8 = 0xD;

    pub fn from_raw(data: u8) -> Self {
        let param = data & 0x0F;
        match data >> 4 {
            0x1 => Self::FinePortaUp(param),
            0x2 => Self::FinePortaDown(param),
            0x3 => Self::GlissandoControl(param),
            0x4 => Self::VibratoControl(param),
            0x5 => Self::SetFinetune(param),
            0x6 => Self::PatternLoop(param),
            0x7 => Self::TremoloControl(param),
            0x9 => Self::Retrigger(param),
            0xA => Self::FineVolumeSlideUp(param),
            0xB => Self::FineVolumeSlideDown(param),
            0xC => Self::NoteCut(param),
            0xD => Self::NoteDelay(param),
            0xE => Self::PatternDelay(param),
            _ => Self::Unused(param),
        }
    }
}

/// Volume column command, carrying the low nibble (or the volume for `SetVolume`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeCommand {
    #[default]
    None,
    /// 0x10-0x50: set volume 0-64 (0x51-0x5F clamp to 64)
    SetVolume(u8),
    /// 6x
    SlideDown(u8),
    /// 7x
    SlideUp(u8),
    /// 8x
    FineSlideDown(u8),
    /// 9x
    FineSlideUp(u8),
    /// Ax
    VibratoSpeed(u8),
    /// Bx
    Vibrato(u8),
    /// Cx
    SetPanning(u8),
    /// Dx
    PanSlideLeft(u8),
    /// Ex
    PanSlideRight(u8),
    /// Fx
    TonePortamento(u8),
}

impl VolumeCommand {
    pub fn from_raw(volume: u8) -> Self {
        let param = volume & 0x0F;
        match volume >> 4 {
            0x1..=0x5 => Self::SetVolume((volume - 0x10).min(64)),
            0x6 => Self::SlideDown(param),
            0x7 => Self::SlideUp(param),
            0x8 => Self::FineSlideDown(param),
            0x9 => Self::FineSlideUp(param),
            0xA => Self::VibratoSpeed(param),
            0xB => Self::Vibrato(param),
            0xC => Self::SetPanning(param),
            0xD => Self::PanSlideLeft(param),
            0xE => Self::PanSlideRight(param),
            0xF => Self::TonePortamento(param),
            _ => Self::None,
        }
    }
}
