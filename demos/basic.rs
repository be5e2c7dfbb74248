use std::time::Duration;
use tokio_event_bus::{async_trait, EventBus, EventHandler, Handler, Result, Source};

#[derive(Debug, Clone)]
struct MyEvent {
    message: String,
}

struct Printer;

#[async_trait]
impl EventHandler<MyEvent> for Printer {
    async fn on_event(&self, _bus: EventBus, event: MyEvent) -> Result<()> {
        println!("📨 Received in object handler: {}", event.message);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    println!("Testing tokio-event-bus...\n");

    // Create event bus
    let bus = EventBus::builder()
        .cache_size(16)
        .pool_size(2)
        .build()
        .await
        .unwrap();

    // Subscribe to events
    bus.subscribe(Handler::from_fn(|_bus: EventBus, event: MyEvent| async move {
        println!("📨 Received: {}", event.message);
        Ok(())
    }));

    bus.subscribe(Handler::from_sourced_fn(
        |bus: EventBus, source: Source, event: MyEvent| async move {
            let from = if source.is_bus(&bus) {
                "the bus".to_string()
            } else {
                source
                    .downcast_ref::<&'static str>()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| source.type_name().to_string())
            };
            println!("📨 Received from {}: {}", from, event.message);
            Ok(())
        },
    ));

    bus.subscribe(Handler::from_object(Printer));

    // Inline dispatch
    println!("Sending events...");
    bus.send_anonymous(MyEvent {
        message: "Hello!".into(),
    })
    .await
    .unwrap();

    // Queued dispatch
    println!("Firing events...");
    bus.fire(
        Some(Source::new("demo")),
        MyEvent {
            message: "World!".into(),
        },
    )
    .await
    .unwrap();

    // Delayed dispatch
    bus.schedule(
        None,
        Duration::from_millis(50),
        false,
        MyEvent {
            message: "Event Bus is working!".into(),
        },
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    println!("\n{}", bus.stats());

    // Clean up
    bus.shutdown_and_wait().await.unwrap();

    println!("\n✅ Test completed successfully!");
}
