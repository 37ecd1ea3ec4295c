use std::io::{Seek, Write};

use image::{ImageFormat, RgbaImage};

use crate::PackageError;
use crate::texture::types::{PixelFormat, TextureMip};

type BlockDecoder = fn(&[u8], usize, usize, &mut [u32]) -> Result<(), &'static str>;

pub struct TextureDecoder {}

impl TextureDecoder {
    /// Decodes one mip level into 8 bit RGBA.
    pub fn decode_mip(format: PixelFormat, mip: &TextureMip) -> Result<RgbaImage, PackageError> {
        let (width, height) = (mip.width as usize, mip.height as usize);
        if width == 0 || height == 0 {
            return Err(PackageError::format("Mip has no extent"));
        }

        let pixels = match format {
            PixelFormat::B8G8R8A8 => {
                TextureDecoder::check_len(mip, width * height * 4)?;
                mip.data[..width * height * 4]
                    .chunks_exact(4)
                    .flat_map(|bgra| [bgra[2], bgra[1], bgra[0], bgra[3]])
                    .collect()
            }
            PixelFormat::R8G8B8A8 => {
                TextureDecoder::check_len(mip, width * height * 4)?;
                mip.data[..width * height * 4].to_vec()
            }
            PixelFormat::G8 => {
                TextureDecoder::check_len(mip, width * height)?;
                mip.data[..width * height]
                    .iter()
                    .flat_map(|&g| [g, g, g, u8::MAX])
                    .collect()
            }
            PixelFormat::DXT1 => TextureDecoder::decode_blocks(format, mip, texture2ddecoder::decode_bc1)?,
            PixelFormat::DXT5 => TextureDecoder::decode_blocks(format, mip, texture2ddecoder::decode_bc3)?,
            PixelFormat::BC4 => TextureDecoder::decode_blocks(format, mip, texture2ddecoder::decode_bc4)?,
            PixelFormat::BC5 => TextureDecoder::decode_blocks(format, mip, texture2ddecoder::decode_bc5)?,
            PixelFormat::BC7 => TextureDecoder::decode_blocks(format, mip, texture2ddecoder::decode_bc7)?,
            _ => return Err(PackageError::UnsupportedPixelFormat { format }),
        };

        RgbaImage::from_raw(mip.width, mip.height, pixels)
            .ok_or_else(|| PackageError::format("Decoded pixel buffer does not match the mip extent"))
    }

    /// Decodes `mip` and encodes it as png into `wtr`.
    pub fn export_png<W: Write + Seek>(format: PixelFormat, mip: &TextureMip, wtr: &mut W) -> Result<(), PackageError> {
        let image = TextureDecoder::decode_mip(format, mip)?;
        image.write_to(wtr, ImageFormat::Png)?;
        Ok(())
    }

    fn decode_blocks(format: PixelFormat, mip: &TextureMip, decoder: BlockDecoder) -> Result<Vec<u8>, PackageError> {
        let (width, height) = (mip.width as usize, mip.height as usize);
        let block_size = format
            .block_size()
            .ok_or(PackageError::UnsupportedPixelFormat { format })?;
        TextureDecoder::check_len(mip, width.div_ceil(4) * height.div_ceil(4) * block_size)?;

        let mut decoded = vec![0u32; width * height];
        decoder(&mip.data, width, height, &mut decoded).map_err(|reason| PackageError::DecodeError { reason })?;

        // the decoder packs every pixel as little endian bgra
        Ok(decoded
            .iter()
            .flat_map(|pixel| {
                let [b, g, r, a] = pixel.to_le_bytes();
                [r, g, b, a]
            })
            .collect())
    }

    fn check_len(mip: &TextureMip, expected: usize) -> Result<(), PackageError> {
        if mip.data.len() < expected {
            return Err(PackageError::TruncatedMip {
                width: mip.width,
                height: mip.height,
                expected,
                actual: mip.data.len(),
            });
        }

        Ok(())
    }
}
