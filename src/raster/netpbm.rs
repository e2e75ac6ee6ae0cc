use std::io::{self, Read, Write};

use super::{check_dimensions, RasterBuffer, RasterReader, RasterWriter};
use crate::error::Error;

pub struct NetpbmRasterReader<T: Read> {
    reader: T,
}

impl<T: Read> NetpbmRasterReader<T> {
    pub fn new(reader: T) -> Self {
        Self { reader }
    }
}

impl<T: Read> RasterReader for NetpbmRasterReader<T> {
    fn read_raster(&mut self) -> crate::Result<RasterBuffer> {
        let tokenizer = NetpbmTokenizer::new(&mut self.reader);
        let mut parser = NetpbmParser::new(tokenizer);
        parser.parse()
    }
}

/// Writes PGM (one channel) or PPM (three channels) in binary encoding.
pub struct NetpbmRasterWriter<T: Write> {
    writer: T,
}

impl<T: Write> NetpbmRasterWriter<T> {
    pub fn new(writer: T) -> Self {
        Self { writer }
    }

    fn magic(channels: u8) -> &'static str {
        match channels {
            1 => "P5",
            _ => "P6",
        }
    }
}

impl<T: Write> RasterWriter for NetpbmRasterWriter<T> {
    fn write_raster(&mut self, raster: &RasterBuffer) -> crate::Result<()> {
        let header = format!(
            "{}\n{} {}\n255\n",
            Self::magic(raster.channels()),
            raster.width(),
            raster.height()
        );
        self.writer
            .write_all(header.as_bytes())
            .map_err(Error::FailedToWriteRaster)?;
        self.writer
            .write_all(raster.samples())
            .map_err(Error::FailedToWriteRaster)?;
        self.writer.flush().map_err(Error::FailedToWriteRaster)
    }
}

struct NetpbmTokenizer<'a, R: Read> {
    reader: &'a mut R,
    buffer: Vec<u8>,
}

impl<'a, R: Read> NetpbmTokenizer<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        NetpbmTokenizer {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Underlying reader, positioned right after the last token and the
    /// single whitespace that terminated it.
    fn reader(&mut self) -> &mut R {
        &mut *self.reader
    }

    /// Next whitespace separated token with comments skipped, `None` at the
    /// end of the input.
    fn next_token(&mut self) -> crate::Result<Option<String>> {
        self.buffer.clear();
        let mut byte = [0; 1];
        let mut in_comment = false;

        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::FailedToReadRasterData(e)),
            }
            if in_comment {
                if byte[0] == b'\n' {
                    in_comment = false;
                }
                continue;
            }
            if byte[0] == b'#' {
                in_comment = true;
                continue;
            }
            if byte[0].is_ascii_whitespace() {
                if !self.buffer.is_empty() {
                    break;
                }
            } else {
                self.buffer.push(byte[0]);
            }
        }

        if self.buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&self.buffer).into_owned()))
    }
}

const MAGIC_TOKEN_NAME: &str = "Magic Number";
const WIDTH_HEADER_TOKEN_NAME: &str = "Width Header";
const HEIGHT_HEADER_TOKEN_NAME: &str = "Height Header";
const MAX_VALUE_HEADER_TOKEN_NAME: &str = "Max Value Header";
const SAMPLE_VALUE_TOKEN_NAME: &str = "Sample Value";

#[derive(Clone, Copy, Debug, PartialEq)]
enum Encoding {
    Ascii,
    Binary,
}

#[derive(Clone, Copy, Debug)]
struct Header {
    encoding: Encoding,
    channels: u8,
    width: u32,
    height: u32,
    max_value: u16,
    number_of_samples: usize,
}

impl Header {
    fn bytes_per_sample(max_value: u16) -> usize {
        if max_value > u8::MAX as u16 {
            2
        } else {
            1
        }
    }

    /// Bytes of binary sample data, `None` when the header describes more
    /// than one allocation can hold.
    fn sample_bytes(width: u32, height: u32, channels: u8, max_value: u16) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(channels as usize)?
            .checked_mul(Self::bytes_per_sample(max_value))
            .filter(|&length| length <= isize::MAX as usize)
    }
}

struct NetpbmParser<'a, R: Read> {
    tokenizer: NetpbmTokenizer<'a, R>,
}

impl<'a, R: Read> NetpbmParser<'a, R> {
    fn new(tokenizer: NetpbmTokenizer<'a, R>) -> Self {
        Self { tokenizer }
    }

    fn parse(&mut self) -> crate::Result<RasterBuffer> {
        let header = self.parse_header()?;
        let samples = match header.encoding {
            Encoding::Ascii => self.parse_ascii_samples(&header)?,
            Encoding::Binary => self.read_binary_samples(&header)?,
        };
        let samples = Self::scale_to_eight_bits(samples, header.max_value)?;
        RasterBuffer::new(header.width, header.height, header.channels, samples)
    }

    fn parse_header(&mut self) -> crate::Result<Header> {
        let (encoding, channels) = self.parse_magic()?;
        let width = self.parse_u32(WIDTH_HEADER_TOKEN_NAME)?;
        let height = self.parse_u32(HEIGHT_HEADER_TOKEN_NAME)?;
        check_dimensions(width, height, channels)?;
        let max_value = self.parse_u32(MAX_VALUE_HEADER_TOKEN_NAME)?;
        if max_value == 0 || max_value > u16::MAX as u32 {
            return Err(Error::InvalidMaxValue(max_value));
        }
        let max_value = max_value as u16;
        let sample_bytes = Header::sample_bytes(width, height, channels, max_value).ok_or(
            Error::RasterTooLarge {
                width,
                height,
                channels,
            },
        )?;
        Ok(Header {
            encoding,
            channels,
            width,
            height,
            max_value,
            number_of_samples: sample_bytes / Header::bytes_per_sample(max_value),
        })
    }

    fn parse_magic(&mut self) -> crate::Result<(Encoding, u8)> {
        let magic = self
            .tokenizer
            .next_token()?
            .ok_or(Error::NetpbmFileDoesNotContainRequiredToken(MAGIC_TOKEN_NAME))?;
        match magic.as_str() {
            "P2" => Ok((Encoding::Ascii, 1)),
            "P3" => Ok((Encoding::Ascii, 3)),
            "P5" => Ok((Encoding::Binary, 1)),
            "P6" => Ok((Encoding::Binary, 3)),
            _ => Err(Error::UnsupportedNetpbmMagic(magic)),
        }
    }

    fn parse_u32(&mut self, token_name: &'static str) -> crate::Result<u32> {
        self.tokenizer
            .next_token()?
            .ok_or(Error::NetpbmFileDoesNotContainRequiredToken(token_name))?
            .parse()
            .map_err(|_| Error::ParsingOfTokenFailed(token_name))
    }

    fn parse_ascii_samples(&mut self, header: &Header) -> crate::Result<Vec<u16>> {
        let mut samples = Vec::new();
        while let Some(token) = self.tokenizer.next_token()? {
            if samples.len() == header.number_of_samples {
                return Err(Error::MismatchOfSizeBetweenHeaderAndValues);
            }
            let sample = token
                .parse::<u16>()
                .map_err(|_| Error::ParsingOfTokenFailed(SAMPLE_VALUE_TOKEN_NAME))?;
            samples.push(sample);
        }
        if samples.len() != header.number_of_samples {
            return Err(Error::MismatchOfSizeBetweenHeaderAndValues);
        }
        Ok(samples)
    }

    fn read_binary_samples(&mut self, header: &Header) -> crate::Result<Vec<u16>> {
        let bytes_per_sample = Header::bytes_per_sample(header.max_value);
        let length = header.number_of_samples * bytes_per_sample;
        let mut bytes = Vec::new();
        self.tokenizer
            .reader()
            .take(length as u64)
            .read_to_end(&mut bytes)
            .map_err(Error::FailedToReadRasterData)?;
        if bytes.len() != length {
            return Err(Error::FailedToReadRasterData(
                io::ErrorKind::UnexpectedEof.into(),
            ));
        }
        let samples = match bytes_per_sample {
            1 => bytes.into_iter().map(u16::from).collect(),
            _ => bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect(),
        };
        Ok(samples)
    }

    fn scale_to_eight_bits(samples: Vec<u16>, max_value: u16) -> crate::Result<Vec<u8>> {
        let max = max_value as u32;
        samples
            .into_iter()
            .map(|sample| {
                if sample > max_value {
                    return Err(Error::SampleExceedsMaxValue(sample, max_value));
                }
                Ok(((sample as u32 * 255 + max / 2) / max) as u8)
            })
            .collect()
    }
}
