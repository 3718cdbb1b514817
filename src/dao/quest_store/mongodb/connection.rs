use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::error::{MongoDaoError, MongoResult};

/// Pings per connection attempt; the storage supervisor retries whole attempts.
const PING_ATTEMPTS: u32 = 3;
const PING_BACKOFF: Duration = Duration::from_millis(250);

/// Open a client on `database_name` and wait until the server answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempt = 1;
    loop {
        let Err(err) = database.run_command(doc! { "ping": 1 }).await else {
            debug!(database = database_name, attempt, "quest database reachable");
            return Ok((client, database));
        };
        if attempt == PING_ATTEMPTS {
            return Err(MongoDaoError::InitialPing {
                attempts: attempt,
                source: err,
            });
        }
        let wait = PING_BACKOFF * attempt;
        warn!(attempt, wait_ms = wait.as_millis(), error = %err, "quest database ping failed");
        sleep(wait).await;
        attempt += 1;
    }
}
