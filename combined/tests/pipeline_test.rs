//! End-to-end pipeline: user creation through the broker to email delivery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{NotificationRequest, User, UserDraft};
use email_service_lib::consumer::NotificationConsumer;
use email_service_lib::delivery::{DeliveryError, DeliveryHandler};
use messaging::{BrokerConfig, InMemoryBroker, MessageChannel};
use user_service_lib::notifier::BrokerNotifier;
use user_service_lib::repository::UserRepository;
use user_service_lib::service::{UserManager, UserService};

#[derive(Default)]
struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, draft: UserDraft) -> AppResult<User> {
        let user = User::new(Uuid::new_v4(), draft.name, draft.email);
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.users.lock().unwrap().values().cloned().collect())
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        let slot = users.get_mut(&user.id).ok_or(AppError::NotFound)?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.users
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }

    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.users.lock().unwrap().contains_key(&id))
    }
}

#[derive(Default)]
struct RecordingHandler {
    delivered: Mutex<Vec<NotificationRequest>>,
}

#[async_trait]
impl DeliveryHandler for RecordingHandler {
    async fn deliver(&self, notification: &NotificationRequest) -> Result<(), DeliveryError> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_created_user_receives_exactly_one_welcome_email() {
    let config = BrokerConfig::default();
    let broker = InMemoryBroker::with_topology(&config);
    let channel: Arc<dyn MessageChannel> = Arc::new(broker.clone());

    let handler = Arc::new(RecordingHandler::default());
    let subscription = channel.subscribe(&config.queue, "pipeline").await.unwrap();
    let consumer = NotificationConsumer::new(handler.clone());
    let consumer_task = tokio::spawn(async move { consumer.run(subscription).await });

    let service = UserManager::new(
        Arc::new(InMemoryUserRepository::default()),
        Arc::new(BrokerNotifier::from_config(channel.clone(), &config)),
    );

    let ana = service
        .create_user(Some("Ana".into()), Some("ana@example.com".into()))
        .await
        .unwrap();
    assert_eq!(service.get_user(ana.id).await.unwrap(), ana);

    // Updates and deletes never notify.
    service
        .update_user(ana.id, Some("Ana".into()), Some("ana@example.org".into()))
        .await
        .unwrap();

    broker.close();
    let report = consumer_task.await.unwrap();

    assert_eq!(report.received, 1);
    assert_eq!(report.delivered, 1);

    let delivered = handler.delivered.lock().unwrap();
    assert_eq!(
        *delivered,
        vec![NotificationRequest::new(
            "ana@example.com",
            "Bem-vindo ao nosso sistema!",
            "Olá, Ana! Seu cadastro foi realizado com sucesso.",
        )]
    );
}

#[tokio::test]
async fn test_rejected_user_produces_no_email() {
    let config = BrokerConfig::default();
    let broker = InMemoryBroker::with_topology(&config);
    let channel: Arc<dyn MessageChannel> = Arc::new(broker.clone());

    let handler = Arc::new(RecordingHandler::default());
    let subscription = channel.subscribe(&config.queue, "pipeline").await.unwrap();
    let consumer = NotificationConsumer::new(handler.clone());
    let consumer_task = tokio::spawn(async move { consumer.run(subscription).await });

    let service = UserManager::new(
        Arc::new(InMemoryUserRepository::default()),
        Arc::new(BrokerNotifier::from_config(channel.clone(), &config)),
    );

    let result = service.create_user(Some("Ana".into()), None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(service.list_users().await.unwrap().is_empty());

    broker.close();
    let report = consumer_task.await.unwrap();

    assert_eq!(report.received, 0);
    assert!(handler.delivered.lock().unwrap().is_empty());
}
