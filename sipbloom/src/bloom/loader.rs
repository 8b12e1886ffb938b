// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

use tracing::debug;

use super::BloomFilter;
use super::BloomFilterBuilder;
use crate::error::Error;

const COUNT_BUFFER_SIZE: usize = 8192;

/// Counts the lines of `reader` in one forward pass and seeks it back to the start.
///
/// Every `\n` ends a line; trailing bytes after the last `\n` count as one more line.
///
/// # Examples
///
/// ```
/// # use std::io::Cursor;
/// # use sipbloom::bloom::count_lines;
/// let mut source = Cursor::new("apple\nbanana\ncherry");
/// assert_eq!(count_lines(&mut source).unwrap(), 3);
/// assert_eq!(source.position(), 0);
/// ```
pub fn count_lines<R: Read + Seek>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; COUNT_BUFFER_SIZE];
    let mut count = 0u64;
    let mut last = None;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        count += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(buf[n - 1]);
    }

    if matches!(last, Some(b) if b != b'\n') {
        count += 1;
    }

    reader.seek(SeekFrom::Start(0))?;
    Ok(count)
}

impl BloomFilter {
    /// Builds a filter holding every line of a seekable source.
    ///
    /// The source is read twice: once to count its lines, which sizes the filter for
    /// `false_positive_rate`, and once more after rewinding to add the lines. Each line is
    /// trimmed of surrounding whitespace and lowercased before it is added; blank lines are
    /// skipped. An empty source yields an empty filter sized for a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::error::ErrorKind::Io) if reading or seeking fails and
    /// [`InvalidConfiguration`](crate::error::ErrorKind::InvalidConfiguration) if
    /// `false_positive_rate` is not strictly between 0 and 1.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::io::Cursor;
    /// # use sipbloom::bloom::BloomFilter;
    /// # use sipbloom::bloom::ONE_IN_TEN_THOUSAND;
    /// let filter = BloomFilter::from_reader(Cursor::new("  FOO \nBar\n"), ONE_IN_TEN_THOUSAND)
    ///     .unwrap();
    /// assert!(filter.has("foo"));
    /// assert!(filter.has("bar"));
    /// assert!(!filter.has("FOO"));
    /// ```
    pub fn from_reader<R: Read + Seek>(
        mut reader: R,
        false_positive_rate: f64,
    ) -> Result<Self, Error> {
        let num_lines =
            count_lines(&mut reader).map_err(|err| Error::io("count source lines", err))?;
        let mut filter = BloomFilterBuilder::with_accuracy(num_lines.max(1), false_positive_rate)
            .and_then(BloomFilterBuilder::build)
            .map_err(|err| err.with_context("num_lines", num_lines))?;
        debug!(num_lines, "counted filter source");

        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        let mut num_read = 0u64;
        let mut num_added = 0u64;
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line).map_err(|err| {
                Error::io("read source line", err).with_context("line", num_read + 1)
            })?;
            if n == 0 {
                break;
            }
            num_read += 1;

            let entry = String::from_utf8_lossy(&line);
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            filter.add(entry.to_lowercase());
            num_added += 1;
        }

        debug!(
            num_added,
            bits_used = filter.bits_used(),
            load_factor = filter.load_factor(),
            "loaded filter source"
        );
        Ok(filter)
    }

    /// Builds a filter holding every line of the file at `path`.
    ///
    /// See [`from_reader`](Self::from_reader) for how lines become entries.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::error::ErrorKind::Io) if the file cannot be opened or read, and
    /// [`InvalidConfiguration`](crate::error::ErrorKind::InvalidConfiguration) for a bad
    /// `false_positive_rate`.
    pub fn from_file(path: impl AsRef<Path>, false_positive_rate: f64) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            Error::io("open filter source", err).with_context("path", path.display())
        })?;
        Self::from_reader(file, false_positive_rate)
            .map_err(|err| err.with_context("path", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::io::Read;

    use super::count_lines;

    #[test]
    fn test_count_lines() {
        let cases: [(&str, u64); 6] = [
            ("", 0),
            ("foo", 1),
            ("foo\n", 1),
            ("foo\nbar", 2),
            ("foo\nbar\n", 2),
            ("\n\n\n", 3),
        ];
        for (input, expected) in cases {
            let mut source = Cursor::new(input);
            assert_eq!(count_lines(&mut source).unwrap(), expected, "{input:?}");
        }
    }

    #[test]
    fn test_count_lines_spanning_buffers() {
        let input = "word\n".repeat(5000);
        let mut source = Cursor::new(input.clone());
        assert_eq!(count_lines(&mut source).unwrap(), 5000);

        let mut input = input.into_bytes();
        input.extend_from_slice(b"tail");
        let mut source = Cursor::new(input);
        assert_eq!(count_lines(&mut source).unwrap(), 5001);
    }

    #[test]
    fn test_count_lines_rewinds() {
        let mut source = Cursor::new("alpha\nbeta\n");
        count_lines(&mut source).unwrap();
        let mut contents = String::new();
        source.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "alpha\nbeta\n");
    }
}
