mod ascii_format;
pub(crate) use self::ascii_format::*;

mod ascii_reader;
pub use self::ascii_reader::*;

#[cfg(test)]
mod test_util;
#[cfg(test)]
pub(crate) use self::test_util::*;
