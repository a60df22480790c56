//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod trajectory {
    use std::io::{self, Write};

    const HEADER: &str = "node,time_s,x_m,y_m,vx_m_s,vy_m_s,theta_rad,omega_rad_s,mass_kg,thrust_n,gimbal_rad,rcs_left_n,rcs_right_n";

    /// Write the trajectory CSV header.
    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// One node of a trajectory. The terminal node has no control and leaves those columns empty.
    #[derive(Debug, Clone, Copy)]
    pub struct Record<'a> {
        pub node: usize,
        pub time_s: f64,
        pub state: &'a [f64],
        pub control: Option<&'a [f64]>,
    }

    impl<'a> Record<'a> {
        /// Serialize the record to CSV, matching the header ordering.
        pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
            write!(writer, "{},{:.3}", self.node, self.time_s)?;
            for (i, v) in self.state.iter().enumerate() {
                // Angles need more digits than positions.
                if i == 4 || i == 5 {
                    write!(writer, ",{:.6}", v)?;
                } else {
                    write!(writer, ",{:.4}", v)?;
                }
            }
            match self.control {
                Some([thrust, gimbal, left, right]) => {
                    writeln!(writer, ",{thrust:.3},{gimbal:.6},{left:.3},{right:.3}")
                }
                Some(other) => Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("control row has {} values, expected 4", other.len()),
                )),
                None => writeln!(writer, ",,,,"),
            }
        }
    }

    /// Write a full trajectory: `states` has one more node than `controls`.
    pub fn write_trajectory<'a, S, C>(
        writer: &mut dyn Write,
        dt: f64,
        states: S,
        controls: C,
    ) -> io::Result<usize>
    where
        S: IntoIterator<Item = &'a [f64]>,
        C: IntoIterator<Item = &'a [f64]>,
    {
        write_header(writer)?;
        let mut controls = controls.into_iter();
        let mut rows = 0;
        for (node, state) in states.into_iter().enumerate() {
            Record {
                node,
                time_s: node as f64 * dt,
                state,
                control: controls.next(),
            }
            .write_to(writer)?;
            rows += 1;
        }
        writer.flush()?;
        Ok(rows)
    }
}

pub mod summary {
    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use std::io::{self, Write};
    use std::path::Path;

    /// Provenance recorded next to a solve result.
    #[derive(Debug, Clone, Serialize)]
    pub struct Metadata<'a> {
        pub scenario: &'a str,
        pub vehicle: &'a str,
        pub generated_utc: &'a str,
    }

    #[derive(Serialize)]
    struct SummaryFile<'a, T: Serialize> {
        #[serde(flatten)]
        meta: &'a Metadata<'a>,
        result: &'a T,
    }

    /// Write `result` with its metadata as pretty JSON (`-` for stdout).
    pub fn write_summary<T: Serialize>(
        path: &Path,
        meta: &Metadata<'_>,
        result: &T,
    ) -> io::Result<()> {
        let mut writer = super::writer_for_path(path)?;
        to_writer_pretty(&mut writer, &SummaryFile { meta, result })?;
        writeln!(writer)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_node_leaves_control_columns_empty() {
        let states = [
            [0.0, 100.0, 0.0, -5.0, 0.01, 0.0, 28_000.0],
            [0.0, 97.5, 0.0, -5.0, 0.01, 0.0, 27_990.0],
        ];
        let controls = [[250_000.0, 0.0, 0.0, 10.0]];
        let mut out = Vec::new();
        let rows = trajectory::write_trajectory(
            &mut out,
            0.5,
            states.iter().map(|s| s.as_slice()),
            controls.iter().map(|c| c.as_slice()),
        )
        .unwrap();
        assert_eq!(rows, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("node,time_s,x_m"));
        assert_eq!(lines[1].split(',').count(), 13);
        assert!(lines[1].ends_with(",250000.000,0.000000,0.000,10.000"));
        assert!(lines[2].starts_with("1,0.500,"));
        assert!(lines[2].ends_with(",,,,"));
    }

    #[test]
    fn summary_lands_in_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/summary.json");
        let meta = summary::Metadata {
            scenario: "hop",
            vehicle: "default",
            generated_utc: "2026-01-01T00:00:00Z",
        };
        summary::write_summary(&path, &meta, &vec![1.0, 2.0]).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["scenario"], "hop");
        assert_eq!(value["result"][1], 2.0);
    }
}
