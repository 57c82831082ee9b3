//! Minimal PAP test client: sends one Access-Request and prints the
//! verdict. Remember to register this machine's source address as a NAS
//! first, or the server will (correctly) stay silent.
//!
//! Usage: pap_client <username> <password> <secret> [server_addr]

use std::net::UdpSocket;
use std::time::Duration;
use wispr_proto::auth::{encrypt_user_password, generate_request_authenticator};
use wispr_proto::{Attribute, AttributeType, Code, Packet};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <username> <password> <secret> [server_addr]", args[0]);
        eprintln!("Example: {} alice wonderland testing123 127.0.0.1:1812", args[0]);
        std::process::exit(1);
    }
    let (username, password, secret) = (&args[1], &args[2], args[3].as_bytes());
    let server_addr = args.get(4).map(String::as_str).unwrap_or("127.0.0.1:1812");

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(server_addr)?;
    socket.set_read_timeout(Some(Duration::from_secs(5)))?;

    let request_auth = generate_request_authenticator();
    let mut request = Packet::new(Code::AccessRequest, 1, request_auth);
    request.add_attribute(Attribute::string(AttributeType::UserName, username)?);
    let hidden = encrypt_user_password(password, secret, &request_auth)?;
    request.add_attribute(Attribute::new(AttributeType::UserPassword, hidden)?);

    println!("-> Access-Request for {username} to {server_addr}");
    socket.send(&request.encode()?)?;

    let mut buffer = [0u8; 4096];
    let len = socket.recv(&mut buffer).map_err(|e| {
        format!("no response ({e}); is this source address registered as a NAS?")
    })?;
    let response = Packet::decode(&buffer[..len])?;

    match response.code {
        Code::AccessAccept => {
            println!("<- Access-Accept");
            for attr in &response.attributes {
                println!("   attribute {}: {:?}", attr.attr_type, wispr_proto::dictionary::decode_value(attr));
            }
        }
        Code::AccessReject => println!("<- Access-Reject"),
        other => println!("<- unexpected {other:?}"),
    }
    Ok(())
}
