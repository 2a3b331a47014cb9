//! Integration tests for docent-core services
//!
//! These run the room directory and token validation together over the
//! in-memory backends, the same way the signaling endpoint uses them.
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;

use docent_core::{
    models::{EventId, NewRoom, RoomId, UserId},
    service::{auth::TokenType, JwtService, JwtValidator},
    Error, MemoryEventDirectory, MemoryRoomStore, RoomService,
};

const SECRET: &[u8] = b"integration-test-secret-0123456789";

#[tokio::test]
async fn test_token_holder_admitted_to_event_room() {
    let jwt = Arc::new(JwtService::new(SECRET).unwrap());
    let validator = JwtValidator::new(jwt.clone());

    let events = Arc::new(MemoryEventDirectory::new());
    events.accept_participant(EventId::from("night-tour"), UserId::from("visitor-1"));
    let rooms = RoomService::new(Arc::new(MemoryRoomStore::new()), events.clone());

    let room = rooms
        .create_room(NewRoom::for_event(EventId::from("night-tour")).with_id(RoomId::from("room-1")))
        .await
        .unwrap();

    let token = jwt
        .sign_token(&UserId::from("visitor-1"), TokenType::Access)
        .unwrap();
    let header = format!("Bearer {token}");
    let user = validator.authenticate(Some(&header), None).unwrap();

    assert!(rooms.validate_membership(&user, &room.id).await.unwrap());
    assert!(!rooms
        .validate_membership(&UserId::from("visitor-2"), &room.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_refresh_token_rejected_for_signaling() {
    let jwt = Arc::new(JwtService::new(SECRET).unwrap());
    let validator = JwtValidator::new(jwt.clone());

    let refresh = jwt
        .sign_token(&UserId::from("visitor-1"), TokenType::Refresh)
        .unwrap();
    assert!(matches!(
        validator.authenticate(None, Some(&refresh)),
        Err(Error::Authentication(_))
    ));
    assert!(matches!(
        validator.authenticate(None, None),
        Err(Error::Authentication(_))
    ));
}

#[tokio::test]
async fn test_event_listing_after_delete() {
    let events = Arc::new(MemoryEventDirectory::new());
    events.add_event(EventId::from("gala"));
    let rooms = RoomService::new(Arc::new(MemoryRoomStore::new()), events);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let room = rooms
            .create_room(NewRoom::for_event(EventId::from("gala")))
            .await
            .unwrap();
        ids.push(room.id);
    }

    rooms.delete_room(&ids[1]).await.unwrap();

    let listed = rooms.get_rooms_by_event(&EventId::from("gala")).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|room| room.id != ids[1]));
    assert!(matches!(rooms.get_room(&ids[1]).await, Err(Error::NotFound(_))));
}
