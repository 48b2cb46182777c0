//! BER-encoded primitives: the subset the MCS Connect envelope and the
//! CredSSP TSRequest codec rely on. Lengths use the short form up to 0x7F and
//! the one- or two-octet long form above it.

#[cfg(test)]
mod tests;

use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

pub const SIZEOF_ENUMERATED: u16 = 3;
pub const SIZEOF_BOOL: u16 = 3;

const TAG_MASK: u8 = 0x1F;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Pc {
    Primitive = 0x00,
    Construct = 0x20,
}

#[repr(u8)]
#[derive(Copy, Clone)]
enum Class {
    Universal = 0x00,
    Application = 0x40,
    ContextSpecific = 0x80,
}

#[repr(u8)]
#[derive(Copy, Clone)]
enum Tag {
    Boolean = 0x01,
    Integer = 0x02,
    OctetString = 0x04,
    Enumerated = 0x0A,
    Sequence = 0x10,
}

pub fn sizeof_application_tag(tagnum: u8, length: u16) -> u16 {
    let tag_len = if tagnum > 0x1E { 2 } else { 1 };

    sizeof_length(length) + tag_len
}

pub fn sizeof_sequence_tag(length: u16) -> u16 {
    1 + sizeof_length(length)
}

pub fn sizeof_sequence(length: u16) -> u16 {
    length + sizeof_sequence_tag(length)
}

pub fn sizeof_contextual_tag(length: u16) -> u16 {
    1 + sizeof_length(length)
}

pub fn sizeof_octet_string(length: u16) -> u16 {
    1 + sizeof_length(length) + length
}

pub fn sizeof_sequence_octet_string(length: u16) -> u16 {
    sizeof_octet_string(length) + sizeof_contextual_tag(sizeof_octet_string(length))
}

pub fn sizeof_integer(value: u32) -> u16 {
    if value < 0x0000_0080 {
        3
    } else if value < 0x0000_8000 {
        4
    } else if value < 0x0080_0000 {
        5
    } else {
        6
    }
}

pub fn write_sequence_tag(mut stream: impl io::Write, length: u16) -> io::Result<usize> {
    write_universal_tag(&mut stream, Tag::Sequence, Pc::Construct)?;

    write_length(&mut stream, length).map(|len| len + 1)
}

pub fn read_sequence_tag(mut stream: impl io::Read) -> io::Result<u16> {
    let identifier = stream.read_u8()?;

    if identifier != Class::Universal as u8 | Pc::Construct as u8 | (TAG_MASK & Tag::Sequence as u8)
    {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid BER sequence tag identifier",
        ))
    } else {
        read_length(&mut stream)
    }
}

pub fn write_application_tag(
    mut stream: impl io::Write,
    tagnum: u8,
    length: u16,
) -> io::Result<usize> {
    let taglen = if tagnum > 0x1E {
        stream.write_u8(Class::Application as u8 | Pc::Construct as u8 | TAG_MASK)?;
        stream.write_u8(tagnum)?;
        2
    } else {
        stream.write_u8(Class::Application as u8 | Pc::Construct as u8 | (TAG_MASK & tagnum))?;
        1
    };

    write_length(&mut stream, length).map(|len| len + taglen)
}

pub fn read_application_tag(mut stream: impl io::Read, tagnum: u8) -> io::Result<u16> {
    let identifier = stream.read_u8()?;

    if tagnum > 0x1E {
        if identifier != Class::Application as u8 | Pc::Construct as u8 | TAG_MASK
            || stream.read_u8()? != tagnum
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid BER application tag identifier",
            ));
        }
    } else if identifier != Class::Application as u8 | Pc::Construct as u8 | (TAG_MASK & tagnum) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid BER application tag identifier",
        ));
    }

    read_length(&mut stream)
}

pub fn write_contextual_tag(
    mut stream: impl io::Write,
    tagnum: u8,
    length: u16,
    pc: Pc,
) -> io::Result<usize> {
    stream.write_u8(Class::ContextSpecific as u8 | pc as u8 | (TAG_MASK & tagnum))?;

    write_length(&mut stream, length).map(|len| len + 1)
}

pub fn read_contextual_tag(mut stream: impl io::Read, tagnum: u8, pc: Pc) -> io::Result<u16> {
    let identifier = stream.read_u8()?;

    if identifier != Class::ContextSpecific as u8 | pc as u8 | (TAG_MASK & tagnum) {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid BER contextual tag identifier",
        ))
    } else {
        read_length(&mut stream)
    }
}

/// As [`read_contextual_tag`], but an absent or different tag rewinds the
/// stream and yields `None` so optional fields can be probed in order.
pub fn read_contextual_tag_or_unwind(
    mut stream: impl io::Read + io::Seek,
    tagnum: u8,
    pc: Pc,
) -> io::Result<Option<u16>> {
    let identifier = match stream.read_u8() {
        Ok(identifier) => identifier,
        Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };

    if identifier != Class::ContextSpecific as u8 | pc as u8 | (TAG_MASK & tagnum) {
        stream.seek(io::SeekFrom::Current(-1))?;

        Ok(None)
    } else {
        read_length(&mut stream).map(Some)
    }
}

pub fn write_enumerated(mut stream: impl io::Write, enumerated: u8) -> io::Result<usize> {
    write_universal_tag(&mut stream, Tag::Enumerated, Pc::Primitive)?;
    let size = write_length(&mut stream, 1)?;
    stream.write_u8(enumerated)?;

    Ok(size + 2)
}

pub fn read_enumerated(mut stream: impl io::Read, count: u8) -> io::Result<u8> {
    read_universal_tag(&mut stream, Tag::Enumerated, Pc::Primitive)?;

    if read_length(&mut stream)? != 1 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid BER enumerated length",
        ));
    }

    let enumerated = stream.read_u8()?;
    if enumerated == u8::max_value() || enumerated + 1 > count {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid BER enumerated value",
        ));
    }

    Ok(enumerated)
}

pub fn write_bool(mut stream: impl io::Write, value: bool) -> io::Result<usize> {
    write_universal_tag(&mut stream, Tag::Boolean, Pc::Primitive)?;
    let size = write_length(&mut stream, 1)?;
    stream.write_u8(if value { 0xFF } else { 0x00 })?;

    Ok(size + 2)
}

pub fn read_bool(mut stream: impl io::Read) -> io::Result<bool> {
    read_universal_tag(&mut stream, Tag::Boolean, Pc::Primitive)?;

    if read_length(&mut stream)? != 1 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid BER boolean length",
        ));
    }

    Ok(stream.read_u8()? != 0)
}

pub fn write_integer(mut stream: impl io::Write, value: u32) -> io::Result<usize> {
    write_universal_tag(&mut stream, Tag::Integer, Pc::Primitive)?;

    if value < 0x0000_0080 {
        write_length(&mut stream, 1)?;
        stream.write_u8(value as u8)?;

        Ok(3)
    } else if value < 0x0000_8000 {
        write_length(&mut stream, 2)?;
        stream.write_u16::<BigEndian>(value as u16)?;

        Ok(4)
    } else if value < 0x0080_0000 {
        write_length(&mut stream, 3)?;
        stream.write_u8((value >> 16) as u8)?;
        stream.write_u16::<BigEndian>((value & 0xFFFF) as u16)?;

        Ok(5)
    } else {
        write_length(&mut stream, 4)?;
        stream.write_u32::<BigEndian>(value)?;

        Ok(6)
    }
}

pub fn read_integer(mut stream: impl io::Read) -> io::Result<u64> {
    read_universal_tag(&mut stream, Tag::Integer, Pc::Primitive)?;

    match read_length(&mut stream)? {
        1 => Ok(u64::from(stream.read_u8()?)),
        2 => Ok(u64::from(stream.read_u16::<BigEndian>()?)),
        3 => {
            let a = stream.read_u8()?;
            let b = stream.read_u16::<BigEndian>()?;

            Ok(u64::from(b) + (u64::from(a) << 16))
        }
        4 => Ok(u64::from(stream.read_u32::<BigEndian>()?)),
        8 => stream.read_u64::<BigEndian>(),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid BER integer length",
        )),
    }
}

pub fn write_octet_string(mut stream: impl io::Write, value: &[u8]) -> io::Result<usize> {
    let tag_size = write_octet_string_tag(&mut stream, value.len() as u16)?;
    stream.write_all(value)?;

    Ok(tag_size + value.len())
}

pub fn write_octet_string_tag(mut stream: impl io::Write, length: u16) -> io::Result<usize> {
    write_universal_tag(&mut stream, Tag::OctetString, Pc::Primitive)?;

    write_length(&mut stream, length).map(|len| len + 1)
}

pub fn read_octet_string(mut stream: impl io::Read) -> io::Result<Vec<u8>> {
    let length = read_octet_string_tag(&mut stream)?;

    let mut buffer = vec![0; length as usize];
    stream.read_exact(buffer.as_mut())?;

    Ok(buffer)
}

pub fn read_octet_string_tag(mut stream: impl io::Read) -> io::Result<u16> {
    read_universal_tag(&mut stream, Tag::OctetString, Pc::Primitive)?;

    read_length(&mut stream)
}

/// Writes a contextually-tagged octet string, the shape every optional
/// TSRequest and TSPasswordCreds field takes.
pub fn write_sequence_octet_string(
    mut stream: impl io::Write,
    tagnum: u8,
    value: &[u8],
) -> io::Result<usize> {
    let tag_size = write_contextual_tag(
        &mut stream,
        tagnum,
        sizeof_octet_string(value.len() as u16),
        Pc::Construct,
    )?;
    let string_size = write_octet_string(&mut stream, value)?;

    Ok(tag_size + string_size)
}

fn write_universal_tag(mut stream: impl io::Write, tag: Tag, pc: Pc) -> io::Result<usize> {
    stream.write_u8(Class::Universal as u8 | pc as u8 | (TAG_MASK & tag as u8))?;

    Ok(1)
}

fn read_universal_tag(mut stream: impl io::Read, tag: Tag, pc: Pc) -> io::Result<()> {
    let identifier = stream.read_u8()?;

    if identifier != Class::Universal as u8 | pc as u8 | (TAG_MASK & tag as u8) {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid BER universal tag identifier",
        ))
    } else {
        Ok(())
    }
}

fn write_length(mut stream: impl io::Write, length: u16) -> io::Result<usize> {
    if length > 0xFF {
        stream.write_u8(0x80 | 0x02)?;
        stream.write_u16::<BigEndian>(length)?;

        Ok(3)
    } else if length > 0x7F {
        stream.write_u8(0x80 | 0x01)?;
        stream.write_u8(length as u8)?;

        Ok(2)
    } else {
        stream.write_u8(length as u8)?;

        Ok(1)
    }
}

fn read_length(mut stream: impl io::Read) -> io::Result<u16> {
    let byte = stream.read_u8()?;

    if byte & 0x80 != 0 {
        match byte & !0x80 {
            1 => Ok(u16::from(stream.read_u8()?)),
            2 => stream.read_u16::<BigEndian>(),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid BER length of the length",
            )),
        }
    } else {
        Ok(u16::from(byte))
    }
}

fn sizeof_length(length: u16) -> u16 {
    if length > 0xFF {
        3
    } else if length > 0x7F {
        2
    } else {
        1
    }
}
