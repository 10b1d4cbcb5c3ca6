use plus_web::{BoxError, Event, EventEmitter, Request, Router, Server, stream_fn};
use std::time::Duration;

async fn ticks(request: Request, mut emitter: EventEmitter) -> Result<(), BoxError> {
    let count = request.param("count").and_then(|count| count.as_int()).unwrap_or(5);

    emitter.send(Event::retry(Duration::from_secs(3))).await?;
    for i in 0..count {
        tokio::time::sleep(Duration::from_secs(1)).await;
        emitter.send(Event::named("tick", i.to_string()).id(i.to_string())).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let mut router = Router::new();
    router.register_stream("/ticks/:count:int", stream_fn(ticks))?;

    // curl -N -H 'Accept: text/event-stream' http://127.0.0.1:8080/ticks/3
    Server::builder().router(router).address("127.0.0.1").build()?.start().await;
    Ok(())
}
