// LTC frame - the 80-bit SMPTE 12M word
//
// Bit i of `bits` is the i-th bit on the wire. BCD fields are LSB first.
//
//   0-3   frame units      4-7   user 1
//   8-9   frame tens       10    drop-frame flag    11 color frame
//   12-15 user 2           16-19 second units       20-23 user 3
//   24-26 second tens      27    polarity (525) / BGF0 (625)
//   28-31 user 4           32-35 minute units       36-39 user 5
//   40-42 minute tens      43    BGF0 (525) / BGF2 (625)
//   44-47 user 6           48-51 hour units         52-55 user 7
//   56-57 hour tens        58    BGF1
//   59    BGF2 (525) / polarity (625)
//   60-63 user 8           64-79 sync word

use crate::timecode::rate::{FrameRate, TvStandard};
use crate::timecode::smpte::SmpteTimecode;

pub const LTC_FRAME_BITS: usize = 80;

/// Bits 64..80 in transmission order: 0011 1111 1111 1101
pub const SYNC_WORD: u16 = 0xBFFC;
pub const SYNC_WORD_POSITION: usize = 64;

const DROP_FRAME_BIT: usize = 10;
const USER_BIT_GROUPS: [usize; 8] = [4, 12, 20, 28, 36, 44, 52, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LtcFrame {
    pub bits: u128,
}

impl LtcFrame {
    /// Builds the complete word, sync and polarity bits included
    pub fn from_timecode(tc: &SmpteTimecode, rate: FrameRate, encode_date: bool) -> Self {
        let mut frame = LtcFrame::default();

        frame.set_bcd(0, 8, 2, tc.frame);
        frame.set_bcd(16, 24, 3, tc.second);
        frame.set_bcd(32, 40, 3, tc.minute);
        frame.set_bcd(48, 56, 2, tc.hour);
        frame.set_bit(DROP_FRAME_BIT, rate.drop_frame());

        if encode_date {
            let year = tc.year.rem_euclid(100) as u8;
            let digits = [tc.day % 10, tc.day / 10, tc.month % 10, tc.month / 10, year % 10, year / 10];
            for (group, digit) in digits.iter().enumerate() {
                frame.set_user_group(group, *digit);
            }
        }

        frame.set_field(SYNC_WORD_POSITION, 16, SYNC_WORD as u32);
        frame.fix_polarity(rate.tv_standard());
        frame
    }

    pub fn bit(&self, index: usize) -> bool {
        (self.bits >> index) & 1 == 1
    }

    pub fn set_bit(&mut self, index: usize, value: bool) {
        if value {
            self.bits |= 1u128 << index;
        } else {
            self.bits &= !(1u128 << index);
        }
    }

    pub fn field(&self, position: usize, width: usize) -> u32 {
        ((self.bits >> position) & ((1u128 << width) - 1)) as u32
    }

    pub fn set_field(&mut self, position: usize, width: usize, value: u32) {
        let mask = ((1u128 << width) - 1) << position;
        self.bits = (self.bits & !mask) | (((value as u128) << position) & mask);
    }

    fn set_bcd(&mut self, units_at: usize, tens_at: usize, tens_width: usize, value: u8) {
        self.set_field(units_at, 4, (value % 10) as u32);
        self.set_field(tens_at, tens_width, (value / 10) as u32);
    }

    fn bcd(&self, units_at: usize, tens_at: usize, tens_width: usize) -> u8 {
        (self.field(tens_at, tens_width) * 10 + self.field(units_at, 4)) as u8
    }

    pub fn user_group(&self, group: usize) -> u8 {
        self.field(USER_BIT_GROUPS[group], 4) as u8
    }

    pub fn set_user_group(&mut self, group: usize, value: u8) {
        self.set_field(USER_BIT_GROUPS[group], 4, value as u32);
    }

    pub fn sync_word(&self) -> u16 {
        self.field(SYNC_WORD_POSITION, 16) as u16
    }

    pub fn has_sync_word(&self) -> bool {
        self.sync_word() == SYNC_WORD
    }

    pub fn drop_frame_flag(&self) -> bool {
        self.bit(DROP_FRAME_BIT)
    }

    pub fn polarity_bit_position(standard: TvStandard) -> usize {
        match standard {
            TvStandard::Ntsc => 27,
            TvStandard::Pal => 59,
        }
    }

    /// Sets the polarity correction bit so the word holds an even number of ones
    pub fn fix_polarity(&mut self, standard: TvStandard) {
        let position = Self::polarity_bit_position(standard);
        self.set_bit(position, false);
        let ones = (self.bits & ((1u128 << LTC_FRAME_BITS) - 1)).count_ones();
        self.set_bit(position, ones % 2 == 1);
    }

    pub fn ones_count(&self) -> u32 {
        (self.bits & ((1u128 << LTC_FRAME_BITS) - 1)).count_ones()
    }

    /// Time-of-day fields; the calendar fields are left at zero
    pub fn timecode(&self) -> SmpteTimecode {
        SmpteTimecode {
            hour: self.bcd(48, 56, 2),
            minute: self.bcd(32, 40, 3),
            second: self.bcd(16, 24, 3),
            frame: self.bcd(0, 8, 2),
            ..SmpteTimecode::default()
        }
    }

    /// `(two-digit year, month, day)` as carried in the user bits
    pub fn date(&self) -> (u8, u8, u8) {
        let digit = |group| self.user_group(group);
        (digit(5) * 10 + digit(4), digit(3) * 10 + digit(2), digit(1) * 10 + digit(0))
    }
}
