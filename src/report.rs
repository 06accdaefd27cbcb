use crate::TbResult;
use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};
use log::info;
use num_format::{Locale, ToFormattedString};
use prettytable::{Cell, Row, Table};
use std::io;
use std::path::Path;

pub const SUITE_NAME: &str = "axi_rd_tb";
pub const TEST_NAME: &str = "read_interconnect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterStats {
    pub id: usize,
    pub issued: u64,
    pub completed: u32,
    pub beats_checked: u64,
    pub pending: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlaveStats {
    pub id: usize,
    pub accepted: u64,
    pub beats: u64,
    pub stalls: u64,
    pub retired: u64,
    pub pending: usize,
}

#[derive(Debug, Clone)]
pub struct TbReport {
    pub seed: u64,
    pub cycles: u64,
    pub wall_secs: f64,
    pub masters: Vec<MasterStats>,
    pub slaves: Vec<SlaveStats>,
    pub verdict: TbResult,
}

fn count<T: ToFormattedString>(n: T) -> String {
    n.to_formatted_string(&Locale::en)
}

/// Progress line: `cycles` simulated in `secs` of wall time up to `cycle`.
pub fn speed_line(cycle: u64, cycles: u64, secs: f64) -> String {
    let speed = match secs > 0.0 {
        true => (cycles as f64 / secs) as u64,
        false => 0,
    };
    format!("cycle {}: {} cycles/s", count(cycle), count(speed))
}

fn row(cells: Vec<String>) -> Row {
    Row::new(cells.iter().map(|c| Cell::new(c)).collect())
}

impl TbReport {
    pub fn passed(&self) -> bool {
        self.verdict.is_ok()
    }

    pub fn result(&self) -> TbResult {
        self.verdict.clone()
    }

    pub fn sim_speed(&self) -> f64 {
        match self.wall_secs > 0.0 {
            true => self.cycles as f64 / self.wall_secs,
            false => 0.0,
        }
    }

    pub fn result_str(&self) -> String {
        let transactions: u64 = self.masters.iter().map(|m| m.completed as u64).sum();
        let beats: u64 = self.masters.iter().map(|m| m.beats_checked).sum();
        let verdict = match &self.verdict {
            Ok(()) => "passed".to_string(),
            Err(e) => format!("failed: {}", e),
        };
        format!(
            "seed={}, cycles={}, transactions={}, beats={}, {}",
            self.seed,
            count(self.cycles),
            count(transactions),
            count(beats),
            verdict
        )
    }

    pub fn master_table(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(row(
            ["master", "issued", "completed", "beats checked", "pending", "complete"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ));
        for m in &self.masters {
            table.add_row(row(vec![
                m.id.to_string(),
                count(m.issued),
                count(m.completed),
                count(m.beats_checked),
                count(m.pending),
                m.complete.to_string(),
            ]));
        }
        table
    }

    pub fn slave_table(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(row(
            ["slave", "accepted", "beats", "stalls", "retired", "pending"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ));
        for s in &self.slaves {
            table.add_row(row(vec![
                s.id.to_string(),
                count(s.accepted),
                count(s.beats),
                count(s.stalls),
                count(s.retired),
                count(s.pending),
            ]));
        }
        table
    }

    pub fn print_summary(&self) {
        self.master_table().printstd();
        self.slave_table().printstd();
        info!("TEST {}: {}", TEST_NAME, self.result_str());
        info!("Real time: {:.3} s", self.wall_secs);
        info!("Simulation speed: {:.3} cycles/s", self.sim_speed());
    }

    pub fn write_junit(&self, path: &Path) -> io::Result<()> {
        let duration = Duration::seconds_f64(self.wall_secs);
        let test_case = match &self.verdict {
            Ok(()) => TestCaseBuilder::success(TEST_NAME, duration),
            Err(e) => TestCaseBuilder::failure(TEST_NAME, duration, "failure", &e.to_string()),
        }
        .build();
        let test_suite = TestSuiteBuilder::new(SUITE_NAME)
            .add_testcases(vec![test_case])
            .build();
        let report = ReportBuilder::new().add_testsuite(test_suite).build();
        let file = std::fs::File::create(path)?;
        report
            .write_xml(file)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:?}", e)))
    }
}
