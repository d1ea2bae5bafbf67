use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::ledger::BetTracker;
use crate::simulation::SeasonTable;

const SEASON_HEADER: [&str; 8] = [
    "Team",
    "Points",
    "Wins",
    "Draws",
    "Losses",
    "Title",
    "TopFour",
    "Relegation",
];

/// Header plus one row per team, values rounded to 2 decimals.
pub fn season_rows(table: &SeasonTable) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(table.rows.len() + 1);
    rows.push(SEASON_HEADER.iter().map(|h| h.to_string()).collect());
    for row in &table.rows {
        rows.push(vec![
            row.team.clone(),
            format!("{:.2}", row.points),
            format!("{:.2}", row.wins),
            format!("{:.2}", row.draws),
            format!("{:.2}", row.losses),
            format!("{:.2}", row.title),
            format!("{:.2}", row.top_four),
            format!("{:.2}", row.relegation),
        ]);
    }
    rows
}

pub fn write_season_csv(path: &Path, table: &SeasonTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create season table {}", path.display()))?;
    for row in season_rows(table) {
        writer.write_record(&row).context("write season row")?;
    }
    writer
        .flush()
        .with_context(|| format!("flush season table {}", path.display()))?;
    Ok(())
}

pub fn export_season_xlsx(path: &Path, table: &SeasonTable) -> Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Season")?;
        write_rows(sheet, &season_rows(table))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

pub fn bet_rows(tracker: &BetTracker) -> Vec<Vec<String>> {
    let mut rows = vec![
        [
            "Match", "Side", "Odds", "PredictedOdds", "Stake", "Profit", "Result", "Bankroll",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>(),
    ];
    for settled in tracker.settled() {
        let bet = &settled.bet;
        rows.push(vec![
            bet.match_number.to_string(),
            bet.side.label().to_string(),
            format!("{:.2}", bet.true_odds),
            format!("{:.2}", bet.predicted_odds),
            format!("{:.2}", bet.stake),
            format!("{:.2}", bet.profit),
            settled.result.tag().to_string(),
            format!("{:.2}", settled.bankroll_after),
        ]);
    }
    rows
}

/// Settled bets and a bankroll summary. Returns the number of bets written.
pub fn export_bets_xlsx(path: &Path, tracker: &BetTracker) -> Result<usize> {
    let rows = bet_rows(tracker);
    let roi = tracker
        .roi()
        .map(|r| format!("{r:.4}"))
        .unwrap_or_default();
    let summary = vec![
        vec!["Invested".to_string(), format!("{:.2}", tracker.invested())],
        vec!["Profit".to_string(), format!("{:.2}", tracker.profit())],
        vec!["Bankroll".to_string(), format!("{:.2}", tracker.bankroll())],
        vec!["ROI".to_string(), roi],
    ];

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Bets")?;
        write_rows(sheet, &rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(rows.len().saturating_sub(1))
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
