//! `batchline seed` - insert sample pending customers

use anyhow::Result;
use batchline_core::domain::{customers, Customer, CustomerStatus};

use super::connect;

pub async fn run(database_url: Option<&str>, count: usize, with_edge_cases: bool) -> Result<()> {
    let (_, store) = connect(database_url).await?;
    let pool = store.pool();

    let mut inserted = 0usize;
    for i in 1..=count {
        let phone = (i % 3 != 0).then(|| format!("555-01{:02}", i % 100));
        let customer = Customer::new(
            format!("Sample Customer {}", i),
            format!("sample{}@example.com", i),
            phone,
        );
        customers::insert_customer(pool, &customer).await?;
        inserted += 1;
    }

    if with_edge_cases {
        // One inactive customer (stays inactive after processing) and two
        // invalid records (filtered by validation, left pending).
        let edge_cases = [
            Customer::new("Dormant Account", "dormant@example.com", None)
                .with_status(CustomerStatus::Inactive),
            Customer::new("No Email Yet", "", Some("555-0199".to_string())),
            Customer::new("   ", "blank-name@example.com", None),
        ];
        for customer in &edge_cases {
            customers::insert_customer(pool, customer).await?;
            inserted += 1;
        }
    }

    let pending = customers::count_unprocessed(pool).await?;
    println!("Inserted {} customers; {} now pending.", inserted, pending);
    Ok(())
}
