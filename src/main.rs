//! Pledge Engine - Binary Entry Point
//!
//! Loads a small sample book, runs an allocation and prints the result.
//! Set `RUST_LOG=debug` to see every strategy decision.

use pledge_engine::logging::init_logging;
use pledge_engine::{
    AllocationOutcome, ChangeLedger, CustomerDirectory, ImportState, PledgeError, PledgeSession,
    RelaxationConfig, Security, SecurityTree,
};

const CUSTOMERS: &[[&str; 9]] = &[
    ["101", "431118200", "CITY OF SPRINGFIELD", "TREASURER", "500123", "0.45%", "PUBLIC NOW", "MUNI", "240000.00"],
    ["101", "431118200", "CITY OF SPRINGFIELD", "TREASURER", "500124", "0.10%", "PUBLIC MM", "MUNI", "35000.00"],
    ["205", "376000412", "SPRINGFIELD SCHOOL DIST", "", "610877", "0.25%", "PUBLIC NOW", "SCHOOL", "150000.00"],
    ["318", "371155020", "SHELBYVILLE COUNTY", "COLLECTOR", "702210", "0.30%", "PUBLIC MM", "COUNTY", "90000.00"],
];

const SECURITIES: &[[&str; 11]] = &[
    ["INV", "3130ATXD4", "1042", "2031-06-30", "", "", "0", "250000", "248125.50", "AGENCY", "FHLB 4.5% 2031"],
    ["INV", "3133EPKL8", "1043", "2028-03-15", "", "", "0", "100000", "99210.00", "AGENCY", "FFCB 4.1% 2028"],
    ["INV", "912828YV6", "1044", "2026-11-30", "205", "SPRINGFIELD SCHOOL DIST", "50000", "50000", "49650.25", "TSY", "UST 1.5% 2026"],
    ["INV", "3137EAEX3", "1045", "2030-09-23", "", "", "0", "60000", "58840.00", "AGENCY", "FHLMC 0.375% 2030"],
    ["INV", "3135G06G3", "1046", "2027-11-07", "999", "CLOSED CUSTOMER", "40000", "40000", "39100.00", "AGENCY", "FNMA 0.5% 2027"],
    ["INV", "91282CHT1", "1047", "2033-08-15", "", "", "0", "125000", "121750.75", "TSY", "UST 3.875% 2033"],
];

fn main() -> Result<(), PledgeError> {
    init_logging()?;

    println!("===========================================");
    println!("  Pledge Engine");
    println!("===========================================");
    println!();

    let config = RelaxationConfig::from_env()?;

    let mut directory = CustomerDirectory::new();
    for row in CUSTOMERS {
        directory.load_row(&row[..])?;
    }

    let mut pool = SecurityTree::with_capacity(SECURITIES.len());
    let mut ledger = ChangeLedger::new();
    for row in SECURITIES {
        let security = Security::from_fields(&row[..])?;
        directory.place_security(security, &mut pool, &mut ledger);
    }

    println!("Customers: {}", directory.len());
    println!("Pool: {} securities, {} total", pool.len(), pool.sum());
    println!("Needed: {}", directory.total_needed());
    println!();
    print!("{}", pool.render());
    println!();

    let mut session = PledgeSession::new(ImportState::new(directory, pool, ledger), config);

    match session.allocate() {
        Ok(AllocationOutcome::Direct(summary)) => println!(
            "Direct pass: {} customers, {} securities, {} pledged",
            summary.customers, summary.securities, summary.total
        ),
        Ok(AllocationOutcome::Repledged(outcome)) => println!(
            "Repledged at threshold {} after {} passes",
            outcome.threshold, outcome.passes
        ),
        Err(err) => println!("Allocation failed: {err}"),
    }

    // Reruns start from the imported book
    match session.repledge() {
        Ok(outcome) => println!(
            "Full repledge at threshold {} after {} passes",
            outcome.threshold, outcome.passes
        ),
        Err(err) => println!("Repledge failed: {err}"),
    }
    println!();

    for customer in session.directory().iter() {
        println!(
            "  {:>5} {:<26} balance {:>12} pledged {:>12} over/under {:>12}",
            customer.pledge_code,
            customer.name1,
            customer.total_balance(),
            customer.total_pledged(),
            customer.over_under()
        );
    }
    println!();

    let ledger = session.ledger();
    for security in ledger.unpledged.iter().chain(ledger.pledged.iter()) {
        println!(
            "  {:<9} {:>6} {:>12} -> {}",
            security.change_status,
            security.ticket,
            security.market_value,
            security.pledge_id.map(|id| id.to_string()).unwrap_or_default()
        );
    }
    println!();

    let pool = session.pool();
    let stats = pool.verify_invariants()?;
    println!("Pool left: {} securities, height {}", stats.count, stats.height);
    println!("State root: {}", hex::encode(pool.state_root()?));

    Ok(())
}
