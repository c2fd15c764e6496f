/*
cargo run -p github-app-jwt-cli --bin github_app_jwt_gen -- 'app_id' '/path/private-key.pem'

Or

cargo install github-app-jwt-cli
github_app_jwt_gen 'app_id' '/path/private-key.pem'
*/

use std::{env, fs};

use github_app_jwt::create;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app_id = env::args().nth(1).ok_or("missing app_id")?;
    let private_key_path = env::args().nth(2).ok_or("missing private key path")?;

    let private_key_bytes = fs::read(private_key_path)?;

    let token = create(app_id, private_key_bytes, None, None)?;

    println!("{token}");

    Ok(())
}
