use kinship::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = ConfigBuilder::testing()
        .with_log_level(LogLevel::Info)
        .build()?;
    let _guard = kinship::logging::init(&config.logging)?;
    let kinship = kinship::init(config).await?;

    let alice = UserId::new("alice")?;
    let bob = UserId::new("bob")?;
    let carol = UserId::new("carol")?;
    for (id, name) in [(&alice, "Alice"), (&bob, "Bob"), (&carol, "Carol")] {
        kinship
            .store()
            .create_user(UserRecord::new(id.clone()).with_display_name(name))
            .await?;
    }

    let engine = kinship.engine();

    // alice asks bob, bob accepts
    println!("alice -> bob: {}", engine.send_request(&alice, &bob).await?);
    println!("bob accepts: {}", engine.accept_request(&bob, &alice).await?);

    // Crossing requests resolve to a friendship
    println!("carol -> alice: {}", engine.send_request(&carol, &alice).await?);
    println!("alice -> carol: {}", engine.send_request(&alice, &carol).await?);

    let friends = kinship.listing().list_friends(&alice).await?;
    println!("\nalice's friends:");
    for friend in &friends {
        println!(
            "  {} ({})",
            friend.id,
            friend.display_name.as_deref().unwrap_or("-")
        );
    }

    println!(
        "\nbob sees carol as: {:?}",
        engine.relationship_status(&bob, &carol).await?
    );

    // Simulate a lost mirror write and let reconciliation repair it
    kinship
        .store()
        .add_to_set(&bob, EdgeField::Pending, &carol)
        .await?;
    let repairs = kinship.reconciler().reconcile_user(&bob).await?;
    println!("\nreconcile bob: {} repair(s)", repairs.len());
    let received = kinship
        .listing()
        .list_requests(&carol, ListDirection::Received)
        .await?;
    println!(
        "carol's received requests: {:?}",
        received.iter().map(|u| u.id.as_str()).collect::<Vec<_>>()
    );

    Ok(())
}
