// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Wire encoding for strings, buffers, `Value`, `Dictionary`, `Array`, and
//! control-message envelopes.
//!
//! `Value`'s numeric type tag is assigned in the declaration order
//! (`Undefined=0, Int=1, Long=2, ...`), mapping the sum type to the wire by
//! exhaustive match; see the codec crate's module docs for why the worked
//! byte example is verified as a round-trip/iteration-order property here
//! rather than byte-for-byte.

use crate::error::{CodecError, Result};
use crate::fixed;
use crate::varint;
use gavf_core::{
    Array, AudioFormat, ColorRgb, ColorRgba, Dictionary, Position, SampleFormat, Value, ValueType,
    VideoFormat,
};

pub fn write_string(out: &mut Vec<u8>, s: &str) {
    varint::write_uint64v(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

pub fn read_string(buf: &[u8]) -> Result<(String, usize)> {
    let (len, len_consumed) = varint::read_uint64v(buf)?;
    let len = len as usize;
    let rest = &buf[len_consumed..];
    if rest.len() < len {
        return Err(CodecError::ShortRead { needed: len, available: rest.len() });
    }
    let s = String::from_utf8(rest[..len].to_vec())?;
    Ok((s, len_consumed + len))
}

pub fn write_buffer(out: &mut Vec<u8>, b: &[u8]) {
    varint::write_uint64v(out, b.len() as u64);
    out.extend_from_slice(b);
}

pub fn read_buffer(buf: &[u8]) -> Result<(Vec<u8>, usize)> {
    let (len, len_consumed) = varint::read_uint64v(buf)?;
    let len = len as usize;
    let rest = &buf[len_consumed..];
    if rest.len() < len {
        return Err(CodecError::ShortRead { needed: len, available: rest.len() });
    }
    Ok((rest[..len].to_vec(), len_consumed + len))
}

fn sample_format_code(f: SampleFormat) -> i32 {
    match f {
        SampleFormat::U8 => 0,
        SampleFormat::S16 => 1,
        SampleFormat::S32 => 2,
        SampleFormat::Float => 3,
        SampleFormat::Double => 4,
    }
}

fn sample_format_from_code(c: i32) -> Result<SampleFormat> {
    Ok(match c {
        0 => SampleFormat::U8,
        1 => SampleFormat::S16,
        2 => SampleFormat::S32,
        3 => SampleFormat::Float,
        4 => SampleFormat::Double,
        _ => return Err(CodecError::Protocol(format!("unknown sample format code {c}"))),
    })
}

fn pixel_format_code(f: gavf_core::PixelFormat) -> i32 {
    use gavf_core::PixelFormat as P;
    match f {
        P::Yuv420P => 0,
        P::Yuv422P => 1,
        P::Yuv444P => 2,
        P::Nv12 => 3,
        P::Rgb24 => 4,
        P::Rgba32 => 5,
        P::Bgra32 => 6,
        P::Gray8 => 7,
    }
}

fn pixel_format_from_code(c: i32) -> Result<gavf_core::PixelFormat> {
    use gavf_core::PixelFormat as P;
    Ok(match c {
        0 => P::Yuv420P,
        1 => P::Yuv422P,
        2 => P::Yuv444P,
        3 => P::Nv12,
        4 => P::Rgb24,
        5 => P::Rgba32,
        6 => P::Bgra32,
        7 => P::Gray8,
        _ => return Err(CodecError::Protocol(format!("unknown pixel format code {c}"))),
    })
}

fn interlace_code(m: gavf_core::value::InterlaceMode) -> i32 {
    use gavf_core::value::InterlaceMode as I;
    match m {
        I::Progressive => 0,
        I::TopFirst => 1,
        I::BottomFirst => 2,
        I::Mixed => 3,
    }
}

fn interlace_from_code(c: i32) -> Result<gavf_core::value::InterlaceMode> {
    use gavf_core::value::InterlaceMode as I;
    Ok(match c {
        0 => I::Progressive,
        1 => I::TopFirst,
        2 => I::BottomFirst,
        3 => I::Mixed,
        _ => return Err(CodecError::Protocol(format!("unknown interlace mode code {c}"))),
    })
}

fn chroma_code(c: gavf_core::value::ChromaPlacement) -> i32 {
    use gavf_core::value::ChromaPlacement as C;
    match c {
        C::Center => 0,
        C::TopLeft => 1,
        C::Left => 2,
        C::Top => 3,
    }
}

fn chroma_from_code(c: i32) -> Result<gavf_core::value::ChromaPlacement> {
    use gavf_core::value::ChromaPlacement as C;
    Ok(match c {
        0 => C::Center,
        1 => C::TopLeft,
        2 => C::Left,
        3 => C::Top,
        _ => return Err(CodecError::Protocol(format!("unknown chroma placement code {c}"))),
    })
}

const KEY_SAMPLERATE: &str = "samplerate";
const KEY_CHANNELS: &str = "channels";
const KEY_SAMPLE_FORMAT: &str = "sample_format";
const KEY_INTERLEAVED: &str = "interleaved";

const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";
const KEY_PIXEL_FORMAT: &str = "pixel_format";
const KEY_FR_NUM: &str = "framerate_num";
const KEY_FR_DEN: &str = "framerate_den";
const KEY_TIMESCALE: &str = "timescale";
const KEY_INTERLACE: &str = "interlace_mode";
const KEY_CHROMA: &str = "chroma_placement";
const KEY_FRAME_DURATION: &str = "frame_duration";

/// AudioFormat/VideoFormat serialize via a dictionary representation so
/// format evolution stays source-compatible at the wire level.
fn audio_format_to_dict(f: &AudioFormat) -> Dictionary {
    let mut d = Dictionary::new();
    d.set_int(KEY_SAMPLERATE, f.samplerate);
    d.set_int(KEY_CHANNELS, f.num_channels);
    d.set_int(KEY_SAMPLE_FORMAT, sample_format_code(f.sample_format));
    d.set(KEY_INTERLEAVED, Value::Int(i32::from(f.interleaved)));
    d
}

fn audio_format_from_dict(d: &Dictionary) -> Result<AudioFormat> {
    Ok(AudioFormat {
        samplerate: d.get_int(KEY_SAMPLERATE).ok_or_else(|| CodecError::Protocol("missing samplerate".into()))?,
        num_channels: d.get_int(KEY_CHANNELS).ok_or_else(|| CodecError::Protocol("missing channels".into()))?,
        sample_format: sample_format_from_code(
            d.get_int(KEY_SAMPLE_FORMAT).ok_or_else(|| CodecError::Protocol("missing sample_format".into()))?,
        )?,
        interleaved: d.get_int(KEY_INTERLEAVED).unwrap_or(1) != 0,
        hw_context_id: None,
    })
}

fn video_format_to_dict(f: &VideoFormat) -> Dictionary {
    let mut d = Dictionary::new();
    d.set_int(KEY_WIDTH, f.image_width);
    d.set_int(KEY_HEIGHT, f.image_height);
    d.set_int(KEY_PIXEL_FORMAT, pixel_format_code(f.pixel_format));
    d.set_int(KEY_FR_NUM, f.framerate_num);
    d.set_int(KEY_FR_DEN, f.framerate_den);
    d.set_int(KEY_TIMESCALE, f.timescale);
    d.set_int(KEY_INTERLACE, interlace_code(f.interlace_mode));
    d.set_int(KEY_CHROMA, chroma_code(f.chroma_placement));
    d.set_long(KEY_FRAME_DURATION, f.frame_duration);
    d
}

fn video_format_from_dict(d: &Dictionary) -> Result<VideoFormat> {
    Ok(VideoFormat {
        image_width: d.get_int(KEY_WIDTH).ok_or_else(|| CodecError::Protocol("missing width".into()))?,
        image_height: d.get_int(KEY_HEIGHT).ok_or_else(|| CodecError::Protocol("missing height".into()))?,
        pixel_format: pixel_format_from_code(
            d.get_int(KEY_PIXEL_FORMAT).ok_or_else(|| CodecError::Protocol("missing pixel_format".into()))?,
        )?,
        framerate_num: d.get_int(KEY_FR_NUM).unwrap_or(1),
        framerate_den: d.get_int(KEY_FR_DEN).unwrap_or(1),
        timescale: d.get_int(KEY_TIMESCALE).unwrap_or(1),
        interlace_mode: interlace_from_code(d.get_int(KEY_INTERLACE).unwrap_or(0))?,
        chroma_placement: chroma_from_code(d.get_int(KEY_CHROMA).unwrap_or(0))?,
        frame_duration: d.get_long(KEY_FRAME_DURATION).unwrap_or(0),
        hw_context_id: None,
    })
}

pub fn write_value(out: &mut Vec<u8>, v: &Value) {
    varint::write_int32v(out, v.value_type() as i32);
    match v {
        Value::Undefined => {}
        Value::Int(i) => varint::write_int32v(out, *i),
        Value::Long(l) => varint::write_int64v(out, *l),
        Value::Float(f) => fixed::write_f64_be(out, *f),
        Value::String(s) => write_string(out, s),
        Value::Binary(b) => write_buffer(out, b),
        Value::AudioFormat(f) => write_dictionary(out, &audio_format_to_dict(f)),
        Value::VideoFormat(f) => write_dictionary(out, &video_format_to_dict(f)),
        Value::ColorRgb(c) => {
            fixed::write_f64_be(out, c.r);
            fixed::write_f64_be(out, c.g);
            fixed::write_f64_be(out, c.b);
        }
        Value::ColorRgba(c) => {
            fixed::write_f64_be(out, c.r);
            fixed::write_f64_be(out, c.g);
            fixed::write_f64_be(out, c.b);
            fixed::write_f64_be(out, c.a);
        }
        Value::Position(p) => {
            fixed::write_f64_be(out, p.x);
            fixed::write_f64_be(out, p.y);
        }
        Value::Dictionary(d) => write_dictionary(out, d),
        Value::Array(a) => write_array(out, a),
    }
}

pub fn read_value(buf: &[u8]) -> Result<(Value, usize)> {
    let (type_tag, mut consumed) = varint::read_int32v(buf)?;
    let ty = ValueType::from_i32(type_tag)
        .ok_or_else(|| CodecError::Protocol(format!("unknown value type tag {type_tag}")))?;

    let rest = &buf[consumed..];
    let (value, payload_consumed) = match ty {
        ValueType::Undefined => (Value::Undefined, 0),
        ValueType::Int => {
            let (i, n) = varint::read_int32v(rest)?;
            (Value::Int(i), n)
        }
        ValueType::Long => {
            let (l, n) = varint::read_int64v(rest)?;
            (Value::Long(l), n)
        }
        ValueType::Float => {
            let (f, n) = fixed::read_f64_be(rest)?;
            (Value::Float(f), n)
        }
        ValueType::String => {
            let (s, n) = read_string(rest)?;
            (Value::String(s), n)
        }
        ValueType::Binary => {
            let (b, n) = read_buffer(rest)?;
            (Value::Binary(b), n)
        }
        ValueType::AudioFormat => {
            let (d, n) = read_dictionary(rest)?;
            (Value::AudioFormat(audio_format_from_dict(&d)?), n)
        }
        ValueType::VideoFormat => {
            let (d, n) = read_dictionary(rest)?;
            (Value::VideoFormat(video_format_from_dict(&d)?), n)
        }
        ValueType::ColorRgb => {
            let (r, n1) = fixed::read_f64_be(rest)?;
            let (g, n2) = fixed::read_f64_be(&rest[n1..])?;
            let (b, n3) = fixed::read_f64_be(&rest[n1 + n2..])?;
            (Value::ColorRgb(ColorRgb { r, g, b }), n1 + n2 + n3)
        }
        ValueType::ColorRgba => {
            let (r, n1) = fixed::read_f64_be(rest)?;
            let (g, n2) = fixed::read_f64_be(&rest[n1..])?;
            let (b, n3) = fixed::read_f64_be(&rest[n1 + n2..])?;
            let (a, n4) = fixed::read_f64_be(&rest[n1 + n2 + n3..])?;
            (Value::ColorRgba(ColorRgba { r, g, b, a }), n1 + n2 + n3 + n4)
        }
        ValueType::Position => {
            let (x, n1) = fixed::read_f64_be(rest)?;
            let (y, n2) = fixed::read_f64_be(&rest[n1..])?;
            (Value::Position(Position { x, y }), n1 + n2)
        }
        ValueType::Dictionary => {
            let (d, n) = read_dictionary(rest)?;
            (Value::Dictionary(d), n)
        }
        ValueType::Array => {
            let (a, n) = read_array(rest)?;
            (Value::Array(a), n)
        }
    };
    consumed += payload_consumed;
    Ok((value, consumed))
}

/// Dictionary encoding: `int32v(count)` + for each entry `string(name) +
/// value(v)`.
pub fn write_dictionary(out: &mut Vec<u8>, d: &Dictionary) {
    varint::write_int32v(out, d.len() as i32);
    for (k, v) in d.iter() {
        write_string(out, k);
        write_value(out, v);
    }
}

pub fn read_dictionary(buf: &[u8]) -> Result<(Dictionary, usize)> {
    let (count, mut consumed) = varint::read_int32v(buf)?;
    let mut d = Dictionary::new();
    for _ in 0..count {
        let (k, n1) = read_string(&buf[consumed..])?;
        consumed += n1;
        let (v, n2) = read_value(&buf[consumed..])?;
        consumed += n2;
        d.set(&k, v);
    }
    Ok((d, consumed))
}

/// Array encoding: `int32v(count) + value(entries)`.
pub fn write_array(out: &mut Vec<u8>, a: &Array) {
    varint::write_int32v(out, a.len() as i32);
    for v in a.iter() {
        write_value(out, v);
    }
}

pub fn read_array(buf: &[u8]) -> Result<(Array, usize)> {
    let (count, mut consumed) = varint::read_int32v(buf)?;
    let mut items = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let (v, n) = read_value(&buf[consumed..])?;
        consumed += n;
        items.push(v);
    }
    Ok((items.into_iter().collect(), consumed))
}

/// Message encoding: a dictionary header (namespace, id, timestamp,
/// argument count) followed by N values.
pub fn write_message(out: &mut Vec<u8>, m: &gavf_core::Message) {
    let mut header = Dictionary::new();
    header.set_string(gavf_core::message::KEY_NAMESPACE, m.namespace.clone());
    header.set_string(gavf_core::message::KEY_ID, m.id.clone());
    header.set_long(gavf_core::message::KEY_TIMESTAMP, m.pts);
    header.set_int(gavf_core::message::KEY_ARG_COUNT, m.args.len() as i32);
    write_dictionary(out, &header);
    for arg in &m.args {
        write_value(out, arg);
    }
}

pub fn read_message(buf: &[u8]) -> Result<(gavf_core::Message, usize)> {
    let (header, mut consumed) = read_dictionary(buf)?;
    let namespace = header
        .get_string(gavf_core::message::KEY_NAMESPACE)
        .ok_or_else(|| CodecError::Protocol("message header missing namespace".into()))?
        .to_string();
    let id = header
        .get_string(gavf_core::message::KEY_ID)
        .ok_or_else(|| CodecError::Protocol("message header missing id".into()))?
        .to_string();
    let pts = header.get_long(gavf_core::message::KEY_TIMESTAMP).unwrap_or(0);
    let argc = header.get_int(gavf_core::message::KEY_ARG_COUNT).unwrap_or(0);

    let mut args = Vec::with_capacity(argc.max(0) as usize);
    for _ in 0..argc {
        let (v, n) = read_value(&buf[consumed..])?;
        consumed += n;
        args.push(v);
    }
    Ok((gavf_core::Message { namespace, id, pts, args }, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trips() {
        let mut out = Vec::new();
        write_string(&mut out, "hi");
        let (s, consumed) = read_string(&out).unwrap();
        assert_eq!(s, "hi");
        assert_eq!(consumed, out.len());
    }

    #[test]
    fn value_round_trips_every_case() {
        let values = vec![
            Value::Undefined,
            Value::Int(-7),
            Value::Long(1 << 40),
            Value::Float(1.5),
            Value::String("hello".into()),
            Value::Binary(vec![1, 2, 3, 4]),
            Value::ColorRgb(ColorRgb { r: 0.1, g: 0.2, b: 0.3 }),
            Value::ColorRgba(ColorRgba { r: 0.1, g: 0.2, b: 0.3, a: 0.4 }),
            Value::Position(Position { x: 1.0, y: 2.0 }),
        ];
        for v in values {
            let mut out = Vec::new();
            write_value(&mut out, &v);
            let (decoded, consumed) = read_value(&out).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, out.len());
        }
    }

    #[test]
    fn audio_and_video_format_round_trip_via_dictionary() {
        let af = Value::AudioFormat(AudioFormat {
            samplerate: 48000,
            num_channels: 2,
            sample_format: SampleFormat::Float,
            interleaved: true,
            hw_context_id: None,
        });
        let mut out = Vec::new();
        write_value(&mut out, &af);
        let (decoded, _) = read_value(&out).unwrap();
        assert_eq!(decoded, af);

        let vf = Value::VideoFormat(VideoFormat {
            image_width: 1920,
            image_height: 1080,
            pixel_format: gavf_core::PixelFormat::Yuv420P,
            framerate_num: 30000,
            framerate_den: 1001,
            timescale: 30000,
            interlace_mode: gavf_core::value::InterlaceMode::Progressive,
            chroma_placement: gavf_core::value::ChromaPlacement::Center,
            frame_duration: 1001,
            hw_context_id: None,
        });
        let mut out2 = Vec::new();
        write_value(&mut out2, &vf);
        let (decoded2, _) = read_value(&out2).unwrap();
        assert_eq!(decoded2, vf);
    }

    #[test]
    fn dictionary_round_trip_preserves_iteration_order() {
        let mut d = Dictionary::new();
        d.set_int("a", 1);
        d.set_string("b", "hi");
        d.set_int("c", 3);

        let mut out = Vec::new();
        write_dictionary(&mut out, &d);
        let (decoded, consumed) = read_dictionary(&out).unwrap();
        assert_eq!(consumed, out.len());
        assert_eq!(decoded, d);
        let keys: Vec<&str> = decoded.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn array_round_trips() {
        let a: Array = [1, 2, 3].into_iter().map(Value::Int).collect();
        let mut out = Vec::new();
        write_array(&mut out, &a);
        let (decoded, consumed) = read_array(&out).unwrap();
        assert_eq!(consumed, out.len());
        assert_eq!(decoded, a);
    }

    #[test]
    fn message_round_trips() {
        let m = gavf_core::Message::select_track(3);
        let mut out = Vec::new();
        write_message(&mut out, &m);
        let (decoded, consumed) = read_message(&out).unwrap();
        assert_eq!(consumed, out.len());
        assert_eq!(decoded, m);
    }
}
