// src/gcode/reader.rs
use crate::gcode::{GCodeError, GCodeLine, GCodeRingBuffer};

/// Upper bound of lines pulled from the source per poll.
pub const GCODE_LINES_PER_POLL: usize = 4;

/// Moves up to `GCODE_LINES_PER_POLL` non-empty lines from `source` into the
/// buffer. Stops early when the buffer fills or the source runs dry; a line is
/// never pulled without room to store it. Returns the number of lines buffered.
pub fn poll_lines<I, L>(buffer: &mut GCodeRingBuffer, source: &mut I) -> Result<usize, GCodeError>
where
    I: Iterator<Item = L>,
    L: AsRef<[u8]>,
{
    let mut buffered = 0;
    for _ in 0..GCODE_LINES_PER_POLL {
        if buffer.is_full() {
            break;
        }
        let Some(line) = source.next() else {
            break;
        };
        let bytes = line.as_ref().trim_ascii();
        if bytes.is_empty() {
            continue;
        }
        buffer.write(GCodeLine::new(bytes)?)?;
        buffered += 1;
    }
    if buffered > 0 {
        tracing::trace!("Buffered {} G-code lines, {} waiting", buffered, buffer.available());
    }
    Ok(buffered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::GCODE_RING_BUFFER_SIZE;

    #[test]
    fn test_poll_reads_at_most_four_lines() {
        let mut buffer = GCodeRingBuffer::new();
        let mut source = ["G28", "G1X1", "G1X2", "G1X3", "G1X4"].into_iter();
        assert_eq!(poll_lines(&mut buffer, &mut source).unwrap(), 4);
        assert_eq!(buffer.available(), 4);
        assert_eq!(source.next(), Some("G1X4"));
    }

    #[test]
    fn test_poll_skips_blank_lines() {
        let mut buffer = GCodeRingBuffer::new();
        let mut source = ["", "  ", "M104S200\r"].into_iter();
        assert_eq!(poll_lines(&mut buffer, &mut source).unwrap(), 1);
        assert_eq!(buffer.read().unwrap().as_str().unwrap(), "M104S200");
    }

    #[test]
    fn test_poll_does_not_lose_lines_when_full() {
        let mut buffer = GCodeRingBuffer::new();
        for _ in 0..GCODE_RING_BUFFER_SIZE - 1 {
            buffer.write(GCodeLine::new(b"G4").unwrap()).unwrap();
        }
        let mut source = ["G1X1", "G1X2"].into_iter();
        assert_eq!(poll_lines(&mut buffer, &mut source).unwrap(), 1);
        assert!(buffer.is_full());
        assert_eq!(source.next(), Some("G1X2"));
    }
}
